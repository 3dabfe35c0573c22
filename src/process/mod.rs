//! Backend process supervision.
//!
//! ```text
//!            relaunch()                 build ok + start ok
//! Stopped ───────────────▶ Compiling ──────────────────────▶ Running
//!    ▲                         │                                │
//!    └──── build/start fails ──┘          relaunch(): kill,     │
//!                                         wait, then Compiling ◀┘
//! ```
//!
//! At most one backend process exists at a time. The previous process is
//! killed and its exit observed before the next one is started, so two
//! instances never race for the same port.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::process::Child;

use crate::config::ProjectConfig;
use crate::log;
use crate::utils::exec::{Cmd, ExecError, FilterRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Stopped,
    Compiling,
    Running,
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("backend build failed: {0}")]
    Compile(ExecError),

    #[error("failed to start backend: {0}")]
    Start(ExecError),
}

/// Toolchain chatter not worth a log line.
static TOOLCHAIN_FILTER: FilterRule = FilterRule::new(&["go: downloading", "go: finding"]);

/// Owns the single running backend process.
pub struct Supervisor {
    build: Vec<String>,
    run: Option<Vec<String>>,
    root: PathBuf,
    backend_dir: PathBuf,
    binary: PathBuf,
    state: ProcessState,
    child: Option<Child>,
}

impl Supervisor {
    pub fn from_config(config: &ProjectConfig) -> Self {
        Self {
            build: config.backend.build.clone(),
            run: config.backend.run.clone(),
            root: config.root.clone(),
            backend_dir: config.backend.dir.clone(),
            binary: config.backend.binary_path(),
            state: ProcessState::Stopped,
            child: None,
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// OS process id of the running backend.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// `$WAP_*` variables for build and run commands.
    fn vars(&self, binary: &Path) -> FxHashMap<String, String> {
        let mut vars = FxHashMap::default();
        vars.insert("WAP_BINARY".into(), binary.display().to_string());
        vars.insert(
            "WAP_BACKEND_DIR".into(),
            self.backend_dir.display().to_string(),
        );
        vars.insert("WAP_ROOT".into(), self.root.display().to_string());
        vars
    }

    /// Run the host build command, producing `output`.
    pub async fn compile(&mut self, output: &Path) -> Result<(), ProcessError> {
        self.state = ProcessState::Compiling;
        let vars = self.vars(output);
        let command = resolve_args(&self.build, &vars);

        let result = Cmd::from_slice(&command)
            .cwd(&self.backend_dir)
            .envs(&vars)
            .filter(&TOOLCHAIN_FILTER)
            .run()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                self.state = ProcessState::Stopped;
                Err(ProcessError::Compile(err))
            }
        }
    }

    /// Kill the running backend, if any, and wait for it to exit.
    ///
    /// Failures are logged only; the caller always proceeds.
    pub async fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                crate::debug!("run"; "backend had already exited ({})", status);
            }
            _ => {
                if let Err(err) = child.start_kill() {
                    log!("run"; "failed to kill backend: {}", err);
                }
                if let Err(err) = child.wait().await {
                    log!("run"; "failed to wait for backend exit: {}", err);
                }
            }
        }
        self.state = ProcessState::Stopped;
    }

    /// Start the compiled backend with inherited stdout/stderr.
    fn start(&mut self) -> Result<(), ProcessError> {
        let vars = self.vars(&self.binary);
        let command = match &self.run {
            Some(run) => resolve_args(run, &vars),
            None => vec![self.binary.display().to_string()],
        };

        match Cmd::from_slice(&command)
            .cwd(&self.backend_dir)
            .envs(&vars)
            .spawn_inherit()
        {
            Ok(child) => {
                self.child = Some(child);
                self.state = ProcessState::Running;
                Ok(())
            }
            Err(err) => {
                self.state = ProcessState::Stopped;
                Err(ProcessError::Start(err))
            }
        }
    }

    /// Stop the current backend, rebuild it and start the new binary.
    pub async fn relaunch(&mut self) -> Result<(), ProcessError> {
        self.stop().await;
        let binary = self.binary.clone();
        self.compile(&binary).await?;
        self.start()
    }
}

/// Resolve `$WAP_*` variables in command arguments
pub fn resolve_args(args: &[String], vars: &FxHashMap<String, String>) -> Vec<String> {
    args.iter()
        .map(|arg| {
            let mut result = arg.clone();
            for (key, value) in vars {
                let pattern = format!("${}", key);
                result = result.replace(&pattern, value);
            }
            result
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config_at;
    use tempfile::TempDir;

    fn supervisor(temp: &TempDir, build: &[&str], run: Option<&[&str]>) -> Supervisor {
        let config = test_config_at(temp.path());
        std::fs::create_dir_all(&config.backend.dir).unwrap();
        let mut supervisor = Supervisor::from_config(&config);
        supervisor.build = build.iter().map(|s| s.to_string()).collect();
        supervisor.run = run.map(|r| r.iter().map(|s| s.to_string()).collect());
        supervisor
    }

    #[cfg(unix)]
    fn is_alive(pid: u32) -> bool {
        std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .stderr(std::process::Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_resolve_args() {
        let mut vars = FxHashMap::default();
        vars.insert("WAP_BINARY".to_string(), "/p/backend/app".to_string());
        let args = vec!["build".into(), "-o".into(), "$WAP_BINARY".into(), ".".into()];
        assert_eq!(
            resolve_args(&args, &vars),
            vec!["build", "-o", "/p/backend/app", "."]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_compile_expands_binary_path() {
        let temp = TempDir::new().unwrap();
        let mut sup = supervisor(&temp, &["touch", "$WAP_BINARY"], None);
        let binary = sup.binary.clone();

        sup.compile(&binary).await.unwrap();
        assert!(binary.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_compile_failure_stops() {
        let temp = TempDir::new().unwrap();
        let mut sup = supervisor(&temp, &["false"], Some(&["sleep", "30"]));

        let err = sup.relaunch().await.unwrap_err();
        assert!(matches!(err, ProcessError::Compile(_)));
        assert_eq!(sup.state(), ProcessState::Stopped);
        assert!(sup.pid().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_start_failure_stops() {
        let temp = TempDir::new().unwrap();
        let mut sup = supervisor(&temp, &["true"], Some(&["/nonexistent/wap-backend"]));

        let err = sup.relaunch().await.unwrap_err();
        assert!(matches!(err, ProcessError::Start(_)));
        assert_eq!(sup.state(), ProcessState::Stopped);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_relaunch_replaces_process() {
        let temp = TempDir::new().unwrap();
        let mut sup = supervisor(&temp, &["true"], Some(&["sleep", "30"]));

        sup.relaunch().await.unwrap();
        assert_eq!(sup.state(), ProcessState::Running);
        let first = sup.pid().unwrap();
        assert!(is_alive(first));

        sup.relaunch().await.unwrap();
        let second = sup.pid().unwrap();
        assert_ne!(first, second);
        assert!(!is_alive(first));
        assert!(is_alive(second));

        sup.stop().await;
        assert!(!is_alive(second));
        assert_eq!(sup.state(), ProcessState::Stopped);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_relaunch_after_backend_exited() {
        let temp = TempDir::new().unwrap();
        let mut sup = supervisor(&temp, &["true"], Some(&["true"]));

        sup.relaunch().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        sup.relaunch().await.unwrap();
        assert_eq!(sup.state(), ProcessState::Running);
    }
}
