//! Process runner: spawns a sequence of shell commands and supervises
//! each one under a cancellation flag, guaranteeing no orphaned
//! descendants survive a cancelled evaluation.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[cfg(unix)]
pub use unix::UnixProcessGroup as PlatformProcessGroup;
#[cfg(windows)]
pub use windows::WindowsProcessGroup as PlatformProcessGroup;

/// Default interval between non-blocking exit-status/cancellation checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
pub enum RunnerError {
    /// The command could not be spawned at all.
    Spawn { cmd: String, message: String },
    /// The process group / job object could not be torn down on cancel.
    TerminateFailed { cmd: String, message: String },
}

impl std::error::Error for RunnerError {}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerError::Spawn { cmd, message } => {
                write!(f, "could not start command '{cmd}': {message}")
            }
            RunnerError::TerminateFailed { cmd, message } => {
                write!(f, "could not terminate command '{cmd}' after cancellation: {message}")
            }
        }
    }
}

/// Outcome of one non-blocking poll of a running child.
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    Running,
    Exited(i32),
}

/// Platform abstraction over "a child process plus everything it spawned".
/// The two operating-system families diverge enough in how they reap
/// descendants that a thin trait, rather than one code path with `cfg`
/// scattered through it, is the cleanest shape; [`run_commands`] is
/// oblivious to which implementation backs it.
pub trait ProcessGroup: Sized {
    fn spawn(command: &str) -> Result<Self, RunnerError>;
    fn poll(&mut self) -> Result<PollState, RunnerError>;
    fn kill_group(&mut self) -> Result<(), RunnerError>;
}

/// Run `commands` in order in the current working directory, polling each
/// one under `cancel` at [`DEFAULT_POLL_INTERVAL`]. Returns `Ok(true)` if
/// cancellation interrupted the sequence, `Ok(false)` if every command ran
/// to completion (regardless of exit code — the model interface does not
/// treat a nonzero exit as failure on its own).
pub fn run_commands(commands: &[String], cancel: &Arc<AtomicBool>) -> Result<bool, RunnerError> {
    run_commands_with::<PlatformProcessGroup>(commands, cancel, DEFAULT_POLL_INTERVAL)
}

pub(crate) fn run_commands_with<G: ProcessGroup>(
    commands: &[String],
    cancel: &Arc<AtomicBool>,
    poll_interval: Duration,
) -> Result<bool, RunnerError> {
    for cmd in commands {
        log::debug!("spawning command: {cmd}");
        let mut group = G::spawn(cmd)?;
        loop {
            if cancel.load(Ordering::SeqCst) {
                log::info!("cancellation observed, terminating process group for: {cmd}");
                group.kill_group()?;
                return Ok(true);
            }
            match group.poll()? {
                PollState::Running => std::thread::sleep(poll_interval),
                PollState::Exited(code) => {
                    log::debug!("command exited with code {code}: {cmd}");
                    break;
                }
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    thread_local! {
        static KILLED: RefCell<Vec<String>> = RefCell::new(Vec::new());
    }

    /// An in-process stand-in for [`ProcessGroup`] so the polling loop and
    /// cancellation semantics can be tested without touching real child
    /// processes. Each command string is `"exit-after:<n>"`, where `n` is
    /// the number of `poll()` calls that return `Running` before `Exited`.
    struct FakeGroup {
        cmd: String,
        remaining_polls: usize,
    }

    impl ProcessGroup for FakeGroup {
        fn spawn(command: &str) -> Result<Self, RunnerError> {
            let remaining_polls = command
                .strip_prefix("exit-after:")
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            Ok(Self { cmd: command.to_string(), remaining_polls })
        }
        fn poll(&mut self) -> Result<PollState, RunnerError> {
            if self.remaining_polls == 0 {
                Ok(PollState::Exited(0))
            } else {
                self.remaining_polls -= 1;
                Ok(PollState::Running)
            }
        }
        fn kill_group(&mut self) -> Result<(), RunnerError> {
            KILLED.with(|k| k.borrow_mut().push(self.cmd.clone()));
            Ok(())
        }
    }

    #[test]
    fn empty_command_list_never_polls() {
        let cancel = Arc::new(AtomicBool::new(false));
        let cancelled =
            run_commands_with::<FakeGroup>(&[], &cancel, Duration::from_millis(1)).unwrap();
        assert!(!cancelled);
    }

    #[test]
    fn commands_run_to_completion_when_never_cancelled() {
        let cancel = Arc::new(AtomicBool::new(false));
        let commands = vec!["exit-after:0".to_string(), "exit-after:2".to_string()];
        let cancelled =
            run_commands_with::<FakeGroup>(&commands, &cancel, Duration::from_millis(1)).unwrap();
        assert!(!cancelled);
    }

    #[test]
    fn cancel_flag_set_before_any_poll_kills_group_and_stops() {
        let cancel = Arc::new(AtomicBool::new(true));
        let commands = vec!["exit-after:5".to_string()];
        let cancelled =
            run_commands_with::<FakeGroup>(&commands, &cancel, Duration::from_millis(1)).unwrap();
        assert!(cancelled);
        KILLED.with(|k| assert_eq!(k.borrow().len(), 1));
    }
}
