//! Spawns the external flashing tool and streams its output
//!
//! One worker thread per flash; the worker forwards output lines over a
//! channel so the foreground thread stays the only writer of the log. A
//! firmware write can take tens of seconds, so output is streamed as it
//! arrives rather than collected at exit.

use std::{
    io::{self, BufRead, BufReader},
    process::{Command, Stdio},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender},
        Arc,
    },
    thread,
};

use log::debug;

use crate::error::Error;

/// A single flash invocation, consumed entirely by one [`FlashRunner::spawn`]
#[derive(Debug, Clone)]
pub struct FlashJob {
    /// Full argv, tool executable first
    pub command: Vec<String>,
}

/// What the worker reports back while the external tool runs
#[derive(Debug)]
pub enum FlashEvent {
    /// One line of tool output (stdout and stderr combined), in arrival order
    Line(String),
    /// The tool ran to completion with this exit code
    Exited(i32),
    /// The process could not be started at all
    SpawnFailed(Error),
}

/// Receiving end of a running flash; iterate until the channel closes
pub struct FlashHandle {
    /// Worker events, ending with [`FlashEvent::Exited`] or
    /// [`FlashEvent::SpawnFailed`]
    pub events: Receiver<FlashEvent>,
}

/// Launches flash jobs, at most one at a time
pub struct FlashRunner {
    busy: Arc<AtomicBool>,
}

impl FlashRunner {
    pub fn new() -> Self {
        FlashRunner {
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts the tool on a worker thread. Returns
    /// [`Error::FlashInProgress`] while a previous flash is still running;
    /// the runner re-arms once that flash's final event has been sent,
    /// whether it succeeded, failed, or never spawned.
    pub fn spawn(&self, job: FlashJob) -> Result<FlashHandle, Error> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(Error::FlashInProgress);
        }

        let (tx, rx) = mpsc::channel();
        let busy = Arc::clone(&self.busy);

        thread::spawn(move || {
            let last = run_job(job, &tx);
            // Clear the guard before the terminal event so that a caller who
            // has observed completion can start the next flash immediately.
            busy.store(false, Ordering::SeqCst);
            let _ = tx.send(last);
        });

        Ok(FlashHandle { events: rx })
    }
}

impl Default for FlashRunner {
    fn default() -> Self {
        FlashRunner::new()
    }
}

fn run_job(job: FlashJob, events: &Sender<FlashEvent>) -> FlashEvent {
    let Some((program, args)) = job.command.split_first() else {
        return FlashEvent::SpawnFailed(Error::ToolNotFound(String::new()));
    };

    debug!("running: {}", job.command.join(" "));

    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return FlashEvent::SpawnFailed(Error::ToolNotFound(program.clone()));
        }
        Err(e) => return FlashEvent::SpawnFailed(Error::Io(e)),
    };

    // Both streams feed the same sender, so the caller sees lines in the
    // order they arrive.
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(forward_lines(stdout, events.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(forward_lines(stderr, events.clone()));
    }
    for reader in readers {
        let _ = reader.join();
    }

    match child.wait() {
        Ok(status) => FlashEvent::Exited(status.code().unwrap_or(-1)),
        Err(e) => FlashEvent::SpawnFailed(Error::Io(e)),
    }
}

fn forward_lines<R>(stream: R, events: Sender<FlashEvent>) -> thread::JoinHandle<()>
where
    R: io::Read + Send + 'static,
{
    thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            let Ok(line) = line else { break };
            if events.send(FlashEvent::Line(line)).is_err() {
                break;
            }
        }
    })
}
