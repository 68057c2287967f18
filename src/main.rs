use extls::{
    analysis::{self, Unit},
    cache::{parse_file, DiskFile, ParseMode},
    config::Settings,
    diagnostics,
    error::CancelToken,
    language::span::FileSet,
    packages::{self, LoadMode},
};
use std::{env, path::Path, process::ExitCode};

const USAGE: &str = "Usage: extls [parse <file.gop> | vet <dir> [patterns...]]";

fn init_logging(settings: &Settings) {
    tracing_subscriber::fmt()
        .with_max_level(settings.log.max_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_parse(path: &Path) -> ExitCode {
    let mut fset = FileSet::new();
    let parsed = match parse_file(&CancelToken::new(), &mut fset, &DiskFile::new(path), ParseMode::Full) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let errors = diagnostics::syntax_diagnostics(&parsed);
    let count = errors.len();
    for diagnostic in errors {
        diagnostics::emit(diagnostic);
    }
    if parsed.fixed_src || parsed.fixed_ast {
        println!(
            "{}: repaired ({} fixes, source {}, tree {})",
            parsed.name,
            parsed.fixes.len(),
            parsed.fixed_src,
            parsed.fixed_ast
        );
    }
    if count == 0 {
        println!("{}: ok", parsed.name);
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_vet(settings: &Settings, root: &Path, patterns: &[&str]) -> ExitCode {
    let mut cfg = packages::Config {
        mode: LoadMode::NAME | LoadMode::FILES | LoadMode::SYNTAX | LoadMode::TYPES | LoadMode::TYPES_INFO,
        dir: root.to_path_buf(),
        ..packages::Config::default()
    };
    settings.packages.apply(&mut cfg);
    let loaded = match packages::load(&settings.packages.loader(root), &cfg, patterns) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let analyzers = settings.analysis.selected();
    let mut findings = 0;
    for pkg in &loaded {
        for error in &pkg.errors {
            eprintln!("{error}");
            findings += 1;
        }
        let Some(types_info) = &pkg.types_info else { continue };
        let files: Vec<_> = pkg.syntax.iter().map(|parsed| &parsed.file).collect();
        let unit = Unit {
            files: &files,
            arena: &types_info.arena,
            info: &types_info.info,
            pkg: types_info.pkg,
        };
        for outcome in analysis::run(&analyzers, unit) {
            if let analysis::Status::Failed(err) = &outcome.status {
                tracing::warn!(analyzer = outcome.analyzer.name, "{err}");
            }
            for finding in &outcome.diagnostics {
                findings += 1;
                let located = pkg
                    .syntax
                    .iter()
                    .find_map(|parsed| diagnostics::finding_diagnostic(parsed, finding, outcome.analyzer.url));
                match located {
                    Some(diagnostic) => diagnostics::emit(diagnostic),
                    None => eprintln!("{}: {}", finding.category, finding.message),
                }
            }
        }
    }
    if findings == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let cwd = env::current_dir().unwrap_or_else(|_| ".".into());
    let settings = match Settings::discover(&cwd) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&settings);

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["parse", file] => run_parse(Path::new(file)),
        ["vet", dir, patterns @ ..] => run_vet(&settings, Path::new(dir), patterns),
        _ => {
            eprintln!("{USAGE}");
            ExitCode::FAILURE
        }
    }
}
