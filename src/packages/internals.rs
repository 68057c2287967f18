use super::{Config, LoadError, LoadMode, Package, PackageError};
use std::{
    fmt,
    path::{Path, PathBuf},
    process::Command,
    sync::{Arc, RwLock},
};

/// Runs build-tool subcommands for the loader.
pub trait CmdRunner: fmt::Debug + Send + Sync {
    fn run(&self, dir: &Path, verb: &str, args: &[String], env: &[(String, String)]) -> Result<String, LoadError>;
}

/// Spawns the configured tool as a child process.
#[derive(Clone, Debug)]
pub struct ProcessRunner {
    pub tool: String,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self { tool: "gop".into() }
    }
}

impl CmdRunner for ProcessRunner {
    fn run(&self, dir: &Path, verb: &str, args: &[String], env: &[(String, String)]) -> Result<String, LoadError> {
        let command = format!("{} {verb} {}", self.tool, args.join(" "));
        tracing::debug!(%command, dir = %dir.display(), "running build tool");
        let output = Command::new(&self.tool)
            .arg(verb)
            .args(args)
            .envs(env.iter().cloned())
            .current_dir(dir)
            .output()
            .map_err(|err| LoadError::Command {
                command: command.clone(),
                message: err.to_string(),
            })?;
        if !output.status.success() {
            return Err(LoadError::Command {
                command,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Access to package fields that are not part of the public package shape.
///
/// Built once at startup and handed to whoever needs it.
pub trait PackageInternals: Send + Sync {
    fn for_test<'a>(&self, pkg: &'a Package) -> &'a str;
    fn deps_errors<'a>(&self, pkg: &'a Package) -> &'a [PackageError];
    fn cmd_runner(&self) -> Arc<dyn CmdRunner>;
    fn set_cmd_runner(&self, runner: Arc<dyn CmdRunner>);
    fn set_mod_file(&self, cfg: &mut Config, path: PathBuf);
    fn set_mod_flag(&self, cfg: &mut Config, flag: String);
    /// Extra mode bits understood only by the loader.
    fn typecheck_cgo(&self) -> LoadMode;
    fn deps_errors_mode(&self) -> LoadMode;
    fn for_test_mode(&self) -> LoadMode;
}

#[derive(Debug)]
pub struct DefaultInternals {
    runner: RwLock<Arc<dyn CmdRunner>>,
}

impl DefaultInternals {
    pub fn new(runner: Arc<dyn CmdRunner>) -> Self {
        Self {
            runner: RwLock::new(runner),
        }
    }
}

impl Default for DefaultInternals {
    fn default() -> Self {
        Self::new(Arc::new(ProcessRunner::default()))
    }
}

impl PackageInternals for DefaultInternals {
    fn for_test<'a>(&self, pkg: &'a Package) -> &'a str {
        &pkg.raw().for_test
    }

    fn deps_errors<'a>(&self, pkg: &'a Package) -> &'a [PackageError] {
        &pkg.raw().deps_errors
    }

    fn cmd_runner(&self) -> Arc<dyn CmdRunner> {
        let guard = self.runner.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    fn set_cmd_runner(&self, runner: Arc<dyn CmdRunner>) {
        let mut guard = self.runner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = runner;
    }

    fn set_mod_file(&self, cfg: &mut Config, path: PathBuf) {
        cfg.mod_file = Some(path);
    }

    fn set_mod_flag(&self, cfg: &mut Config, flag: String) {
        cfg.mod_flag = Some(flag);
    }

    fn typecheck_cgo(&self) -> LoadMode {
        LoadMode::from_bits(1 << 29)
    }

    fn deps_errors_mode(&self) -> LoadMode {
        LoadMode::from_bits(1 << 30)
    }

    fn for_test_mode(&self) -> LoadMode {
        LoadMode::from_bits(1 << 31)
    }
}
