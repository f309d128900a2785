//! Windows process-group backend: the child is assigned to a Job Object
//! created with "kill on job close" semantics, so closing the job handle
//! tears down every process it spawned along with it.

use std::os::windows::io::AsRawHandle;
use std::process::{Child, Command};

use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};
use windows_sys::Win32::System::JobObjects::{
    AssignProcessToJobObject, CreateJobObjectW, JobObjectExtendedLimitInformation,
    SetInformationJobObject, JOBOBJECT_EXTENDED_LIMIT_INFORMATION, JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE,
};

use super::{PollState, ProcessGroup, RunnerError};

pub struct WindowsProcessGroup {
    cmd: String,
    child: Child,
    job: HANDLE,
}

impl ProcessGroup for WindowsProcessGroup {
    fn spawn(command: &str) -> Result<Self, RunnerError> {
        let child = Command::new("cmd")
            .args(["/C", command])
            .spawn()
            .map_err(|e| RunnerError::Spawn {
                cmd: command.to_string(),
                message: e.to_string(),
            })?;

        // SAFETY: all three calls below are plain FFI with owned,
        // correctly-sized buffers; handles are checked against failure
        // sentinels before use.
        let job = unsafe { CreateJobObjectW(std::ptr::null(), std::ptr::null()) };
        if job == 0 {
            return Err(RunnerError::Spawn {
                cmd: command.to_string(),
                message: "CreateJobObjectW failed".to_string(),
            });
        }

        let mut info: JOBOBJECT_EXTENDED_LIMIT_INFORMATION = unsafe { std::mem::zeroed() };
        info.BasicLimitInformation.LimitFlags = JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE;
        let set_ok = unsafe {
            SetInformationJobObject(
                job,
                JobObjectExtendedLimitInformation,
                &info as *const _ as *const core::ffi::c_void,
                std::mem::size_of::<JOBOBJECT_EXTENDED_LIMIT_INFORMATION>() as u32,
            )
        };
        if set_ok == 0 {
            unsafe { CloseHandle(job) };
            return Err(RunnerError::Spawn {
                cmd: command.to_string(),
                message: "SetInformationJobObject failed".to_string(),
            });
        }

        let assign_ok = unsafe { AssignProcessToJobObject(job, child.as_raw_handle() as HANDLE) };
        if assign_ok == 0 {
            unsafe { CloseHandle(job) };
            return Err(RunnerError::Spawn {
                cmd: command.to_string(),
                message: "AssignProcessToJobObject failed".to_string(),
            });
        }

        Ok(Self { cmd: command.to_string(), child, job })
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
        // SAFETY: `job` is a valid handle owned by this struct until here.
        let ok = unsafe { CloseHandle(self.job) };
        if ok == 0 {
            return Err(RunnerError::TerminateFailed {
                cmd: self.cmd.clone(),
                message: "CloseHandle on job object failed".to_string(),
            });
        }
        self.job = 0;
        let _ = self.child.wait();
        Ok(())
    }
}

impl Drop for WindowsProcessGroup {
    fn drop(&mut self) {
        if self.job != 0 {
            unsafe {
                CloseHandle(self.job);
            }
        }
    }
}
