//! Bounded-time execution of external image converters
//!
//! Converters run on the render path, so a hung process must never stall the
//! event loop. Output is read on a helper thread while the caller polls the
//! child until its deadline, then kills it.

use crate::prelude::{Duration, Instant};
use crate::{MapError, Result};
use crossbeam_channel::bounded;
use std::io::{ErrorKind, Read, Write};
use std::process::{Command, Stdio};
use std::thread;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One invocation of an external converter
#[derive(Debug, Clone)]
pub struct ConverterCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Bytes written to the child's stdin; `None` leaves stdin closed
    pub stdin: Option<Vec<u8>>,
    pub timeout: Duration,
}

impl ConverterCommand {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn stdin(mut self, bytes: Vec<u8>) -> Self {
        self.stdin = Some(bytes);
        self
    }

    /// Runs to completion and returns stdout. Missing binaries, non-zero
    /// exits, empty output and timeouts are all `MapError::Render`.
    pub fn run(self) -> Result<String> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = command.spawn().map_err(|error| {
            if error.kind() == ErrorKind::NotFound {
                MapError::Render(format!("{} was not found on PATH", self.program))
            } else {
                MapError::Render(format!("failed to spawn {}: {}", self.program, error))
            }
        })?;

        if let (Some(bytes), Some(mut stdin)) = (self.stdin, child.stdin.take()) {
            // Written from a thread so a child that stops reading cannot block us
            thread::spawn(move || {
                if let Err(e) = stdin.write_all(&bytes) {
                    log::debug!("converter stdin closed early: {}", e);
                }
            });
        }

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| MapError::Render(format!("failed to capture {} stdout", self.program)))?;
        let (tx, rx) = bounded(1);
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let result = stdout.read_to_end(&mut buffer).map(|_| buffer);
            let _ = tx.send(result);
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(MapError::Render(format!(
                    "{} timed out after {:?}",
                    self.program, self.timeout
                )));
            }
            thread::sleep(POLL_INTERVAL);
        };

        if !status.success() {
            return Err(MapError::Render(format!(
                "{} exited with {}",
                self.program, status
            )));
        }

        let remaining = deadline.saturating_duration_since(Instant::now()).max(POLL_INTERVAL);
        let output = rx
            .recv_timeout(remaining)
            .map_err(|_| MapError::Render(format!("{} output was not closed", self.program)))??;
        if output.is_empty() {
            return Err(MapError::Render(format!("{} produced no output", self.program)));
        }
        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}
