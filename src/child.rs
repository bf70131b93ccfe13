//! # Child process manager.
//!
//! [`ChildProcess`] starts, owns, and can forcibly terminate the
//! supervised program. The executable is used as-is when given as an
//! absolute path and otherwise resolved on the standard executable search
//! path before spawning, so "not found" surfaces as a crisp
//! [`RunError::ChildStart`] instead of a raw spawn failure.
//!
//! Standard streams are inherited from the supervisor. The child is
//! spawned with kill-on-drop so an initialization failure after the spawn
//! never leaves an orphaned process behind.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::RunError;

/// A started, supervised child process.
pub struct ChildProcess {
    program: String,
    child: Child,
}

impl ChildProcess {
    /// Starts the configured executable with its arguments.
    ///
    /// The child receives the supervisor's environment plus the scoped
    /// entries in [`Config::child_env`] (derived defaults such as `PORT`).
    /// Fails with [`RunError::ChildStart`] when no executable is
    /// configured, resolution fails, or the spawn itself fails.
    pub fn start(cfg: &Config) -> Result<Self, RunError> {
        let Some((program, args)) = cfg.exec_args.split_first() else {
            return Err(RunError::ChildStart {
                program: String::new(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "no executable configured"),
            });
        };

        let path = resolve(program).map_err(|source| RunError::ChildStart {
            program: program.clone(),
            source,
        })?;
        debug!(program = %path.display(), ?args, "starting child process");

        let child = Command::new(&path)
            .args(args)
            .envs(cfg.child_env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunError::ChildStart {
                program: program.clone(),
                source,
            })?;

        Ok(Self {
            program: program.clone(),
            child,
        })
    }

    /// The configured program name (unresolved).
    pub fn program(&self) -> &str {
        &self.program
    }

    /// OS process id, if the child is still running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Waits for the child to exit and returns its status.
    ///
    /// Cancellation-safe: this is the event the supervisor races against
    /// the shutdown signal, and it is awaited again after a kill to make
    /// sure the real exit is observed.
    pub async fn wait(&mut self) -> Result<ExitStatus, RunError> {
        self.child
            .wait()
            .await
            .map_err(|source| RunError::ChildWait { source })
    }

    /// Sends a forceful termination signal to the child.
    ///
    /// Best-effort and fire-and-forget: the caller must still await
    /// [`wait`](ChildProcess::wait) to observe the actual exit.
    pub fn kill(&mut self) {
        if let Err(err) = self.child.start_kill() {
            // Already-exited children report InvalidInput; anything else
            // is worth a warning but never aborts the drain.
            if err.kind() != io::ErrorKind::InvalidInput {
                warn!(program = %self.program, error = %err, "failed to signal child process");
            }
        }
    }
}

impl std::fmt::Debug for ChildProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildProcess")
            .field("program", &self.program)
            .field("pid", &self.id())
            .finish()
    }
}

/// Resolves `program` to a spawnable path.
///
/// Absolute paths are trusted as-is; anything else is looked up on `PATH`.
fn resolve(program: &str) -> io::Result<PathBuf> {
    let path = Path::new(program);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    which::which(program)
        .map_err(|err| io::Error::new(io::ErrorKind::NotFound, format!("{program}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    fn exec_cfg(args: &[&str]) -> Config {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        Config::build([config::with_exec(args)]).unwrap()
    }

    #[tokio::test]
    async fn child_exits_zero() {
        let mut child = ChildProcess::start(&exec_cfg(&["true"])).unwrap();
        let status = child.wait().await.unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn child_exit_status_is_observed() {
        let mut child = ChildProcess::start(&exec_cfg(&["false"])).unwrap();
        let status = child.wait().await.unwrap();
        assert!(!status.success());
    }

    #[test]
    fn missing_executable_is_child_start() {
        let err = ChildProcess::start(&exec_cfg(&["definitely-not-a-real-binary-7251"]))
            .unwrap_err();
        assert!(matches!(err, RunError::ChildStart { .. }));
    }

    #[test]
    fn empty_exec_args_is_child_start() {
        let err = ChildProcess::start(&Config::default()).unwrap_err();
        assert!(matches!(err, RunError::ChildStart { .. }));
    }

    #[tokio::test]
    async fn kill_then_wait_observes_termination() {
        let mut child = ChildProcess::start(&exec_cfg(&["sleep", "100"])).unwrap();
        assert!(child.id().is_some());
        child.kill();
        let status = child.wait().await.unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn scoped_env_reaches_the_child() {
        let mut cfg = exec_cfg(&["sh", "-c", "test \"$PORT\" = 5000"]);
        cfg.child_env.push(("PORT".into(), "5000".into()));
        let mut child = ChildProcess::start(&cfg).unwrap();
        assert!(child.wait().await.unwrap().success());
    }
}
