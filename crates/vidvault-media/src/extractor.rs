//! Frame extractor subprocess with piped input and output.
//!
//! The extractor reads the video container from stdin and writes exactly
//! one still image to stdout. It may finish before consuming all of its
//! input once it has the frame it needs, so a broken pipe on the input
//! side is an expected outcome, not a failure.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Render a seek offset in seconds as an ffmpeg `HH:MM:SS` timestamp.
pub fn format_offset(seconds: u32) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Configuration for the frame extractor subprocess.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Executable to run
    pub program: PathBuf,
    /// Full argument list
    pub args: Vec<String>,
    /// Kill the subprocess after this long
    pub timeout: Option<Duration>,
}

impl ExtractorConfig {
    /// Resolve the extractor from the environment: `FRAME_EXTRACTOR_PATH`
    /// if set, otherwise `ffmpeg` on the PATH.
    pub fn resolve(offset_seconds: u32) -> MediaResult<Self> {
        let program = match std::env::var("FRAME_EXTRACTOR_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => which::which("ffmpeg").map_err(|_| MediaError::ExtractorNotFound)?,
        };

        Ok(Self {
            program,
            args: Self::ffmpeg_args(offset_seconds),
            timeout: None,
        })
    }

    /// ffmpeg arguments: read from stdin, seek to the offset, emit one
    /// frame as an image stream on stdout.
    pub fn ffmpeg_args(offset_seconds: u32) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-i".to_string(),
            "pipe:0".to_string(),
            "-ss".to_string(),
            format_offset(offset_seconds),
            "-vframes".to_string(),
            "1".to_string(),
            "-f".to_string(),
            "image2pipe".to_string(),
            "pipe:1".to_string(),
        ]
    }

    /// Set a timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// How the input side of the pipe finished.
#[derive(Debug, PartialEq, Eq)]
enum PipeEnd {
    /// All input was written and the pipe was closed normally
    Drained,
    /// The subprocess closed its input early (expected once it has its frame)
    EarlyClose,
}

/// Runs the frame extractor over a byte stream.
#[derive(Debug, Clone)]
pub struct FrameExtractor {
    config: ExtractorConfig,
}

impl FrameExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Stream `input` through the extractor and return the image bytes.
    ///
    /// Two tasks run concurrently: a producer copying input chunks into
    /// the subprocess stdin and a consumer draining stdout into memory.
    /// Backpressure is implicit; the producer blocks when the stdin pipe
    /// buffer is full.
    pub async fn extract<S>(&self, input: S) -> MediaResult<Vec<u8>>
    where
        S: Stream<Item = std::io::Result<Bytes>> + Send + Unpin + 'static,
    {
        debug!(
            "Spawning frame extractor: {} {}",
            self.config.program.display(),
            self.config.args.join(" ")
        );

        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::internal("stdin not captured"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("stdout not captured"))?;

        let producer = tokio::spawn(async move {
            let mut input = input;
            while let Some(chunk) = input.next().await {
                let chunk = chunk.map_err(MediaError::Io)?;
                if let Err(e) = stdin.write_all(&chunk).await {
                    if e.kind() == ErrorKind::BrokenPipe {
                        return Ok(PipeEnd::EarlyClose);
                    }
                    return Err(MediaError::Io(e));
                }
            }
            // Explicit shutdown so the extractor sees EOF promptly.
            let _ = stdin.shutdown().await;
            Ok(PipeEnd::Drained)
        });

        let consumer = tokio::spawn(async move {
            let mut frame = Vec::new();
            stdout.read_to_end(&mut frame).await.map(|_| frame)
        });

        let status = self.wait_for_exit(&mut child).await;

        let frame = consumer
            .await
            .map_err(|e| MediaError::internal(format!("consumer task panicked: {e}")))?
            .map_err(MediaError::Io)?;
        let pipe_end = producer
            .await
            .map_err(|e| MediaError::internal(format!("producer task panicked: {e}")))??;

        let status = status?;

        if pipe_end == PipeEnd::EarlyClose {
            debug!("Extractor closed its input early");
        }

        if !status.success() {
            warn!("Frame extractor exited with {:?}", status.code());
            return Err(MediaError::extractor_exited(status.code()));
        }

        debug!("Extracted frame: {} bytes", frame.len());
        Ok(frame)
    }

    /// Wait for the child with the configured timeout.
    async fn wait_for_exit(&self, child: &mut Child) -> MediaResult<std::process::ExitStatus> {
        match self.config.timeout {
            Some(timeout) => {
                match tokio::time::timeout(timeout, child.wait()).await {
                    Ok(status) => Ok(status?),
                    Err(_) => {
                        warn!(
                            "Frame extractor timed out after {} seconds, killing process",
                            timeout.as_secs()
                        );
                        let _ = child.kill().await;
                        Err(MediaError::Timeout(timeout.as_secs()))
                    }
                }
            }
            None => Ok(child.wait().await?),
        }
    }
}
