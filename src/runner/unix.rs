//! POSIX process-group backend: the child is spawned as the leader of its
//! own process group, and cancellation kills the whole group with
//! `SIGKILL` so that any workers it forked die with it.

use std::os::unix::process::CommandExt;
use std::process::{Child, Command};

use super::{PollState, ProcessGroup, RunnerError};

pub struct UnixProcessGroup {
    cmd: String,
    child: Child,
    pgid: i32,
}

impl ProcessGroup for UnixProcessGroup {
    fn spawn(command: &str) -> Result<Self, RunnerError> {
        let mut proc = Command::new("/bin/sh");
        proc.arg("-c").arg(command);
        // SAFETY: setpgid(0, 0) only touches the child's own process group
        // membership post-fork, pre-exec; it calls only an async-signal-safe
        // libc function.
        unsafe {
            proc.pre_exec(|| {
                if libc::setpgid(0, 0) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
        let child = proc.spawn().map_err(|e| RunnerError::Spawn {
            cmd: command.to_string(),
            message: e.to_string(),
        })?;
        let pgid = child.id() as i32;
        Ok(Self { cmd: command.to_string(), child, pgid })
    }

    fn poll(&mut self) -> Result<PollState, RunnerError> {
        match self.child.try_wait() {
            Ok(Some(status)) => Ok(PollState::Exited(status.code().unwrap_or(-1))),
            Ok(None) => Ok(PollState::Running),
            Err(e) => Err(RunnerError::Spawn {
                cmd: self.cmd.clone(),
                message: e.to_string(),
            }),
        }
    }

    fn kill_group(&mut self) -> Result<(), RunnerError> {
        // SAFETY: kill() with a negative pid targets the process group by
        // id; both arguments are plain integers, no pointers involved.
        let ret = unsafe { libc::kill(-self.pgid, libc::SIGKILL) };
        if ret != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                return Err(RunnerError::TerminateFailed {
                    cmd: self.cmd.clone(),
                    message: err.to_string(),
                });
            }
        }
        let _ = self.child.wait();
        Ok(())
    }
}
