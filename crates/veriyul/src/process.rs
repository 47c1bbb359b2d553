//! Running external tools under a deadline.
//!
//! Output is captured into anonymous temporary files rather than pipes, so a chatty child
//! can never block on a full pipe while we poll it for exit.

use crate::error::{CollaboratorError, CollaboratorResult};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Spawns `command`, waits at most `timeout` for it to exit and kills it otherwise.
pub fn run(
    command: &mut Command,
    tool: &'static str,
    timeout: Duration,
) -> CollaboratorResult<ProcessOutput> {
    let io_err = |source| CollaboratorError::Io { tool, source };
    let mut stdout = tempfile::tempfile().map_err(io_err)?;
    let mut stderr = tempfile::tempfile().map_err(io_err)?;

    tracing::debug!(?command, "spawning {}", tool);
    let mut child = command
        .stdin(Stdio::null())
        .stdout(stdout.try_clone().map_err(io_err)?)
        .stderr(stderr.try_clone().map_err(io_err)?)
        .spawn()
        .map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => CollaboratorError::NotFound {
                tool,
                hint: format!("could not execute {:?}", command.get_program()),
            },
            _ => CollaboratorError::Io { tool, source },
        })?;

    let status = match wait_timeout(&mut child, timeout).map_err(io_err)? {
        Some(status) => status,
        None => {
            tracing::warn!(seconds = timeout.as_secs(), "{} timed out, killing it", tool);
            child.kill().map_err(io_err)?;
            child.wait().map_err(io_err)?;
            return Err(CollaboratorError::Timeout {
                tool,
                seconds: timeout.as_secs(),
            });
        }
    };

    Ok(ProcessOutput {
        status,
        stdout: read_back(&mut stdout).map_err(io_err)?,
        stderr: read_back(&mut stderr).map_err(io_err)?,
    })
}

/// `Ok(None)` when the deadline passed with the child still running.
fn wait_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn read_back(file: &mut File) -> io::Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
