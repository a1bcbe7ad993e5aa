//! External tool invocation
//!
//! Thin wrapper over `std::process::Command` used for the ffmpeg filter and
//! encoder passes. Output streams are discarded; success is the exit status.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Default executable name, resolved through PATH
pub const DEFAULT_FFMPEG: &str = "ffmpeg";

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A configured external program
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill the child if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the program to completion
    ///
    /// The error is a human-readable reason; callers wrap it in the error
    /// variant for their stage.
    pub fn run<I, S>(&self, args: I) -> std::result::Result<(), String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        log::debug!("running {:?}", command);

        let mut child = command
            .spawn()
            .map_err(|e| format!("failed to start {}: {}", self.program.display(), e))?;

        let status = match self.timeout {
            Some(limit) => wait_with_timeout(&mut child, limit)?,
            None => child
                .wait()
                .map_err(|e| format!("failed to wait for {}: {}", self.program.display(), e))?,
        };

        if status.success() {
            Ok(())
        } else {
            Err(match status.code() {
                Some(code) => format!("{} exited with status {}", self.program.display(), code),
                None => format!("{} was terminated by a signal", self.program.display()),
            })
        }
    }
}

impl Default for ToolCommand {
    fn default() -> Self {
        Self::new(DEFAULT_FFMPEG)
    }
}

fn wait_with_timeout(child: &mut Child, limit: Duration) -> std::result::Result<ExitStatus, String> {
    let deadline = Instant::now() + limit;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                // Reap after kill so no zombie is left behind
                let _ = child.kill();
                let _ = child.wait();
                return Err(format!("timed out after {:.1}s", limit.as_secs_f64()));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return Err(format!("failed to poll child process: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_fails_to_start() {
        let tool = ToolCommand::new("./definitely-not-a-real-tool");
        let err = tool.run(["-version"]).unwrap_err();
        assert!(err.contains("failed to start"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_is_checked() {
        assert!(ToolCommand::new("true").run(Vec::<&str>::new()).is_ok());
        let err = ToolCommand::new("false").run(Vec::<&str>::new()).unwrap_err();
        assert!(err.contains("exited with status 1"));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let tool = ToolCommand::new("sleep").with_timeout(Some(Duration::from_millis(100)));
        let started = Instant::now();
        let err = tool.run(["5"]).unwrap_err();
        assert!(err.contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
