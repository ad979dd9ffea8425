//! Running one encoder pass.
//!
//! stdout and stderr are drained on their own threads. stderr goes through
//! the classifier chain, stdout through the progress reducer. Both threads
//! are joined before the exit status is read so nothing written just before
//! exit is lost.

use std::collections::VecDeque;
use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use burner_common::{BurnerError, BurnerResult};

use crate::classify::{ClassifierChain, ProcessControl};
use crate::command::Invocation;
use crate::progress::ProgressReducer;
use crate::redraw::RedrawWriter;
use crate::tokenizer::LineTokenizer;

/// Number of stderr lines kept for the failure report.
pub const TAIL_LINES: usize = 5;

/// Console shared by both drain threads.
pub type Console<W> = Arc<Mutex<RedrawWriter<W>>>;

/// Wrap `writer` as a shared console.
pub fn console<W: Write>(writer: W) -> Console<W> {
    Arc::new(Mutex::new(RedrawWriter::new(writer)))
}

fn write_console<W: Write>(console: &Console<W>, chunk: &str) {
    let mut guard = console.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(e) = guard.write_chunk(chunk) {
        tracing::debug!(error = %e, "console write failed");
    }
}

/// How a pass ended.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutcome {
    pub exited_normally: bool,
    /// A classifier terminated the process.
    pub was_killed: bool,
    /// Most recent stderr lines, oldest first.
    pub last_lines: VecDeque<String>,
    pub error: Option<String>,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.exited_normally && self.error.is_none()
    }

    /// Whether the tail should be shown to help diagnose the failure.
    /// Classifier kills already printed their own message.
    pub fn should_dump_tail(&self) -> bool {
        !self.exited_normally && !self.was_killed
    }

    /// Turn a failed outcome into a per-file error.
    pub fn into_result(self) -> BurnerResult<Self> {
        if self.success() {
            return Ok(self);
        }
        let reason = self.error.clone().unwrap_or_else(|| "unknown failure".into());
        if self.was_killed {
            Err(BurnerError::process(format!("stopped on fatal diagnostic ({reason})")))
        } else {
            Err(BurnerError::process(reason))
        }
    }
}

struct ChildControl<W> {
    child: Arc<Mutex<Child>>,
    killed: Arc<AtomicBool>,
    console: Console<W>,
}

impl<W: Write> ProcessControl for ChildControl<W> {
    fn terminate(&self) {
        self.killed.store(true, Ordering::SeqCst);
        let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = child.kill() {
            tracing::debug!(error = %e, "kill failed, process already gone");
        }
    }

    fn emit(&self, line: &str) {
        write_console(&self.console, line);
    }
}

/// Runs passes and relays their output to a console.
pub struct Supervisor<W> {
    console: Console<W>,
    chain: Arc<ClassifierChain>,
    progress_stride: Option<usize>,
}

impl<W: Write + Send + 'static> Supervisor<W> {
    /// `progress_stride` is `None` when the encoder is not asked for
    /// `-progress` output; stdout is then relayed line by line.
    pub fn new(console: Console<W>, chain: ClassifierChain, progress_stride: Option<usize>) -> Self {
        Self {
            console,
            chain: Arc::new(chain),
            progress_stride,
        }
    }

    pub fn console(&self) -> &Console<W> {
        &self.console
    }

    /// Run `invocation` to completion.
    ///
    /// Only a failure to start the process is an `Err`; everything after
    /// that is reported through the outcome.
    pub fn run(&self, invocation: &Invocation) -> BurnerResult<ProcessOutcome> {
        tracing::debug!(command = %invocation, dir = %invocation.working_dir.display(), "Running pass");

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                BurnerError::process(format!(
                    "Failed to start {}: {e}",
                    invocation.program.display()
                ))
            })?;

        tracing::debug!(pid = child.id(), "process started");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BurnerError::process("Failed to capture stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BurnerError::process("Failed to capture stderr"))?;

        let child = Arc::new(Mutex::new(child));
        let killed = Arc::new(AtomicBool::new(false));

        let control = ChildControl {
            child: Arc::clone(&child),
            killed: Arc::clone(&killed),
            console: Arc::clone(&self.console),
        };
        let chain = Arc::clone(&self.chain);
        let stderr_task = thread::spawn(move || {
            let mut tail = VecDeque::with_capacity(TAIL_LINES);
            for line in LineTokenizer::new(stderr) {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => return (tail, Some(format!("Failed reading stderr: {e}"))),
                };
                if tail.len() == TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line.clone());
                chain.dispatch(&control, &line);
            }
            (tail, None)
        });

        let console = Arc::clone(&self.console);
        let mut reducer = self.progress_stride.map(ProgressReducer::new);
        let stdout_task = thread::spawn(move || {
            for line in LineTokenizer::new(stdout) {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => return Some(format!("Failed reading stdout: {e}")),
                };
                match reducer.as_mut() {
                    Some(reducer) => {
                        if let Some(summary) = reducer.push(&line) {
                            write_console(&console, &format!("{summary}\r"));
                        }
                    }
                    None => write_console(&console, &line),
                }
            }
            None
        });

        let (last_lines, stderr_error) = stderr_task
            .join()
            .map_err(|_| BurnerError::process("stderr reader panicked"))?;
        let stdout_error = stdout_task
            .join()
            .map_err(|_| BurnerError::process("stdout reader panicked"))?;

        let status = child
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .wait()?;

        let was_killed = killed.load(Ordering::SeqCst);
        let exited_normally = status.success();
        let error = if exited_normally {
            stderr_error.or(stdout_error)
        } else {
            Some(status.to_string())
        };

        tracing::debug!(%status, was_killed, "process finished");

        let outcome = ProcessOutcome {
            exited_normally,
            was_killed,
            last_lines,
            error,
        };
        if outcome.should_dump_tail() {
            for line in &outcome.last_lines {
                write_console(&self.console, line);
            }
        }
        Ok(outcome)
    }
}
