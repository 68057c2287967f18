//! `extls.toml` settings. Every section and key is optional.

use crate::{
    analysis::{passes, Analyzer},
    packages::{self, DirLoader, ProcessRunner},
};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

pub const CONFIG_FILE: &str = "extls.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid settings in `{}`: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub completion: CompletionOptions,
    pub analysis: AnalysisOptions,
    pub packages: PackageOptions,
    pub log: LogOptions,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct CompletionOptions {
    pub snippets: bool,
    pub placeholders: bool,
    pub complete_function_calls: bool,
    pub documentation: bool,
    pub full_documentation: bool,
    pub literal: bool,
    pub deep: bool,
    /// Mark deprecated items with a tag rather than the deprecated flag.
    pub completion_tags: bool,
    pub completion_deprecated: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            snippets: true,
            placeholders: true,
            complete_function_calls: true,
            documentation: true,
            full_documentation: false,
            literal: true,
            deep: true,
            completion_tags: false,
            completion_deprecated: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisOptions {
    pub analyzers: Vec<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            analyzers: passes::all().iter().map(|a| a.name.to_string()).collect(),
        }
    }
}

impl AnalysisOptions {
    /// The enabled analyzers. Unknown names are logged and ignored.
    pub fn selected(&self) -> Vec<&'static Analyzer> {
        self.analyzers
            .iter()
            .filter_map(|name| {
                let found = passes::by_name(name);
                if found.is_none() {
                    tracing::warn!(analyzer = %name, "unknown analyzer in settings");
                }
                found
            })
            .collect()
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct PackageOptions {
    pub ext_suffixes: Vec<String>,
    pub tests: bool,
    /// Build tool asked for module metadata; module files are read when unset.
    pub tool: Option<String>,
    pub build_flags: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self {
            ext_suffixes: packages::Config::default().ext_suffixes,
            tests: false,
            tool: None,
            build_flags: Vec::new(),
            env: BTreeMap::new(),
        }
    }
}

impl PackageOptions {
    pub fn apply(&self, cfg: &mut packages::Config) {
        cfg.ext_suffixes = self.ext_suffixes.clone();
        cfg.tests = self.tests;
        cfg.build_flags = self.build_flags.clone();
        cfg.env = self.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    }

    pub fn loader(&self, root: &Path) -> DirLoader {
        let loader = DirLoader::new(root);
        match &self.tool {
            Some(tool) => loader.with_runner(Arc::new(ProcessRunner { tool: tool.clone() })),
            None => loader,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LogOptions {
    pub level: String,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

impl LogOptions {
    pub fn max_level(&self) -> tracing::Level {
        self.level.parse().unwrap_or(tracing::Level::INFO)
    }
}

impl Settings {
    pub fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: error.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Settings from the nearest `extls.toml` at or above `dir`, or the
    /// defaults when there is none.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        for ancestor in dir.ancestors() {
            let candidate = ancestor.join(CONFIG_FILE);
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "loading settings");
                return Self::load(&candidate);
            }
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_fall_back_to_defaults() {
        let settings = Settings::parse(
            Path::new("extls.toml"),
            "[completion]\nplaceholders = false\nfull-documentation = true\n\n[log]\nlevel = \"debug\"\n",
        )
        .expect("valid settings");
        assert!(!settings.completion.placeholders);
        assert!(settings.completion.full_documentation);
        assert!(settings.completion.snippets);
        assert_eq!(settings.analysis, AnalysisOptions::default());
        assert_eq!(settings.log.max_level(), tracing::Level::DEBUG);
        assert_eq!(settings.packages.ext_suffixes, vec![".gop", ".gox", ".spx"]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Settings::parse(Path::new("extls.toml"), "[completion]\nsnipets = true\n")
            .expect_err("typo is an error");
        assert!(err.to_string().starts_with("Invalid settings in `extls.toml`"));
    }

    #[test]
    fn discovery_walks_up_to_the_nearest_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).expect("create dir");
        assert_eq!(Settings::discover(&nested).expect("defaults"), Settings::default());

        fs::write(
            dir.path().join(CONFIG_FILE),
            "[analysis]\nanalyzers = [\"appends\", \"nosuch\"]\n\n[packages]\next-suffixes = [\".gop\"]\ntests = true\n",
        )
        .expect("write settings");
        let settings = Settings::discover(&nested).expect("loaded");
        let names: Vec<_> = settings.analysis.selected().iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["appends"]);

        let mut cfg = packages::Config::default();
        settings.packages.apply(&mut cfg);
        assert!(cfg.tests);
        assert!(cfg.is_ext_file(Path::new("x.gop")));
        assert!(!cfg.is_ext_file(Path::new("x.spx")));
    }

    #[test]
    fn package_settings_reach_the_loader_config() {
        let settings = Settings::parse(
            Path::new("extls.toml"),
            "[packages]\ntool = \"gop\"\nbuild-flags = [\"-tags=dev\"]\n\n[packages.env]\nGOFLAGS = \"-mod=mod\"\n",
        )
        .expect("valid settings");
        assert_eq!(settings.packages.tool.as_deref(), Some("gop"));

        let mut cfg = packages::Config::default();
        settings.packages.apply(&mut cfg);
        assert_eq!(cfg.build_flags, vec!["-tags=dev".to_string()]);
        assert_eq!(cfg.env, vec![("GOFLAGS".to_string(), "-mod=mod".to_string())]);
        assert!(format!("{:?}", settings.packages.loader(Path::new("."))).contains("ProcessRunner"));
        assert!(!format!("{:?}", PackageOptions::default().loader(Path::new("."))).contains("ProcessRunner"));
    }
}
