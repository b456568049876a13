//! Bibliography format conversion.
//!
//! Non-native sources are normalized to CSL-JSON by an external program.
//! The engine only sees the [`Converter`] trait, so tests substitute an
//! in-process [`FnConverter`] instead of spawning anything.

use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use super::BibliographyFormat;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Error from a conversion attempt.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// The converter program could not be started.
    #[error("failed to run {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O with the running converter failed.
    #[error("I/O error talking to {program}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The converter did not finish within its time budget.
    #[error("{program} timed out after {}s", timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    /// Conversion was cancelled before it finished.
    #[error("conversion cancelled")]
    Cancelled,

    /// The converter exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },

    /// The converter succeeded but printed nothing.
    #[error("converter produced no output")]
    EmptyOutput,

    /// Failure reported by an in-process converter.
    #[error("{0}")]
    Failed(String),
}

/// Format conversion service.
pub trait Converter: Send + Sync {
    /// Convert `input` from one bibliography format to another.
    fn convert(
        &self,
        from: BibliographyFormat,
        to: BibliographyFormat,
        input: &[u8],
    ) -> Result<Vec<u8>, ConversionError>;
}

/// Converter backed by an external pandoc-compatible program.
///
/// Runs `<program> --from=<from> --to=<to> --output=-` with the source on
/// stdin and reads the result from stdout.
#[derive(Debug, Clone)]
pub struct PandocConverter {
    program: String,
    timeout: Duration,
    cancelled: Arc<AtomicBool>,
}

impl PandocConverter {
    /// Create a converter running `program` with a per-call `timeout`.
    #[must_use]
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a cancellation flag with the caller.
    ///
    /// Once the flag is set, running conversions are killed and new ones
    /// fail immediately with [`ConversionError::Cancelled`].
    #[must_use]
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Poll the child until it exits, the timeout expires or the run is
    /// cancelled.
    fn wait(&self, child: &mut Child) -> Result<std::process::ExitStatus, ConversionError> {
        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if self.is_cancelled() {
                        kill(child);
                        return Err(ConversionError::Cancelled);
                    }
                    if started.elapsed() >= self.timeout {
                        kill(child);
                        return Err(ConversionError::Timeout {
                            program: self.program.clone(),
                            timeout: self.timeout,
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(source) => {
                    kill(child);
                    return Err(ConversionError::Io {
                        program: self.program.clone(),
                        source,
                    });
                }
            }
        }
    }
}

impl Converter for PandocConverter {
    fn convert(
        &self,
        from: BibliographyFormat,
        to: BibliographyFormat,
        input: &[u8],
    ) -> Result<Vec<u8>, ConversionError> {
        if self.is_cancelled() {
            return Err(ConversionError::Cancelled);
        }

        tracing::debug!(program = %self.program, %from, %to, "converting bibliography");
        let mut child = Command::new(&self.program)
            .arg(format!("--from={from}"))
            .arg(format!("--to={to}"))
            .arg("--output=-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ConversionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Feed stdin and drain both pipes on their own threads so a large
        // bibliography cannot deadlock on a full pipe buffer.
        let stdin = child.stdin.take().map(|mut stdin| {
            let input = input.to_vec();
            thread::spawn(move || stdin.write_all(&input))
        });
        let stdout = child.stdout.take().map(|pipe| thread::spawn(move || drain(pipe)));
        let stderr = child.stderr.take().map(|pipe| thread::spawn(move || drain(pipe)));

        let status = self.wait(&mut child)?;

        let io_error = |source| ConversionError::Io {
            program: self.program.clone(),
            source,
        };
        // A converter may exit before reading all of stdin; only its exit
        // status matters then.
        if let Some(handle) = stdin {
            let _ = handle.join();
        }
        let output = join_output(stdout).map_err(io_error)?;
        let errors = join_output(stderr).map_err(io_error)?;

        if !status.success() {
            return Err(ConversionError::Exit {
                program: self.program.clone(),
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&errors).trim().to_owned(),
            });
        }
        if output.iter().all(u8::is_ascii_whitespace) {
            return Err(ConversionError::EmptyOutput);
        }
        Ok(output)
    }
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain(mut pipe: impl Read) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)?;
    Ok(buf)
}

fn join_output(
    handle: Option<thread::JoinHandle<std::io::Result<Vec<u8>>>>,
) -> std::io::Result<Vec<u8>> {
    match handle {
        Some(handle) => handle
            .join()
            .unwrap_or_else(|_| Err(std::io::Error::other("output reader panicked"))),
        None => Ok(Vec::new()),
    }
}

/// In-process converter wrapping a closure.
pub struct FnConverter<F>(F);

impl<F> FnConverter<F>
where
    F: Fn(BibliographyFormat, BibliographyFormat, &[u8]) -> Result<Vec<u8>, ConversionError>
        + Send
        + Sync,
{
    #[must_use]
    pub fn new(convert: F) -> Self {
        Self(convert)
    }
}

impl<F> Converter for FnConverter<F>
where
    F: Fn(BibliographyFormat, BibliographyFormat, &[u8]) -> Result<Vec<u8>, ConversionError>
        + Send
        + Sync,
{
    fn convert(
        &self,
        from: BibliographyFormat,
        to: BibliographyFormat,
        input: &[u8],
    ) -> Result<Vec<u8>, ConversionError> {
        (self.0)(from, to, input)
    }
}
