//! Speech synthesis: hand the cleaned text to a neural TTS collaborator.
//!
//! The only stage with side effects beyond reading input. Synthesis sits
//! behind the [`SpeechSynthesizer`] trait so tests and library callers can
//! plug in their own engine; the default [`EdgeTtsSynthesizer`] drives the
//! `edge-tts` command-line client.
//!
//! ## Retry Strategy
//!
//! A synthesis attempt is not idempotent (it writes a media file), so it is
//! retried as a whole unit: every attempt writes to a fresh temp file in the
//! destination directory and only a successful attempt is renamed into
//! place. Waits grow as `retry_backoff_ms * 2^(attempt-1)`.

use crate::config::{NarrationConfig, Voice};
use crate::error::SynthesisError;
use futures::future::BoxFuture;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Environment variable naming the `edge-tts` program.
pub const EDGE_TTS_ENV: &str = "LESSONKIT_EDGE_TTS";

/// A text-to-speech engine that writes audio for `text` to `output`.
///
/// Implementations must be `Send + Sync`; one instance may serve several
/// narrations concurrently.
pub trait SpeechSynthesizer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Synthesize `text` with `voice` into the file at `output`.
    ///
    /// `text` is never empty. `output` may already exist and must be
    /// overwritten.
    fn synthesize<'a>(
        &'a self,
        text: &'a str,
        voice: Voice,
        output: &'a Path,
    ) -> BoxFuture<'a, Result<(), SynthesisError>>;
}

// ── edge-tts ─────────────────────────────────────────────────────────────

/// Runs `edge-tts --voice <id> --file <text> --write-media <out>`.
#[derive(Debug, Clone)]
pub struct EdgeTtsSynthesizer {
    program: PathBuf,
    rate: Option<String>,
    volume: Option<String>,
    pitch: Option<String>,
    timeout_secs: u64,
}

impl EdgeTtsSynthesizer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            rate: None,
            volume: None,
            pitch: None,
            timeout_secs: 300,
        }
    }

    /// Build from narration settings; the program comes from
    /// `edge_tts_program`, then `LESSONKIT_EDGE_TTS`, then `edge-tts` on PATH.
    pub fn from_config(config: &NarrationConfig) -> Self {
        let program = config
            .edge_tts_program
            .clone()
            .or_else(|| std::env::var_os(EDGE_TTS_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("edge-tts"));
        Self {
            program,
            rate: config.rate.clone(),
            volume: config.volume.clone(),
            pitch: config.pitch.clone(),
            timeout_secs: config.synthesis_timeout_secs,
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Command-line arguments for one invocation.
    pub fn args(&self, voice: Voice, text_file: &Path, output: &Path) -> Vec<String> {
        let mut args = vec![
            "--voice".to_string(),
            voice.id().to_string(),
            "--file".to_string(),
            text_file.display().to_string(),
            "--write-media".to_string(),
            output.display().to_string(),
        ];
        // `=` form: values like "-10%" would otherwise parse as flags.
        if let Some(ref rate) = self.rate {
            args.push(format!("--rate={rate}"));
        }
        if let Some(ref volume) = self.volume {
            args.push(format!("--volume={volume}"));
        }
        if let Some(ref pitch) = self.pitch {
            args.push(format!("--pitch={pitch}"));
        }
        args
    }

    async fn run(&self, text: &str, voice: Voice, output: &Path) -> Result<(), SynthesisError> {
        let program = self.program.display().to_string();

        // The text goes through a file: a long lesson does not fit in argv.
        let mut text_file = tempfile::Builder::new()
            .prefix("lessonkit-text-")
            .suffix(".txt")
            .tempfile()
            .map_err(|e| SynthesisError::Io(e.to_string()))?;
        text_file
            .write_all(text.as_bytes())
            .and_then(|_| text_file.flush())
            .map_err(|e| SynthesisError::Io(e.to_string()))?;

        let args = self.args(voice, text_file.path(), output);
        debug!("Running {} {}", program, args.join(" "));

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => SynthesisError::ProgramNotFound {
                    program: program.clone(),
                },
                _ => SynthesisError::Spawn {
                    program: program.clone(),
                    detail: e.to_string(),
                },
            })?;

        let result = timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| SynthesisError::Timeout {
            secs: self.timeout_secs,
        })?
        .map_err(|e| SynthesisError::Io(e.to_string()))?;

        if !result.status.success() {
            return Err(SynthesisError::Failed {
                status: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        let len = tokio::fs::metadata(output)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if len == 0 {
            return Err(SynthesisError::EmptyAudio {
                path: output.to_path_buf(),
            });
        }
        Ok(())
    }
}

impl SpeechSynthesizer for EdgeTtsSynthesizer {
    fn name(&self) -> &str {
        "edge-tts"
    }

    fn synthesize<'a>(
        &'a self,
        text: &'a str,
        voice: Voice,
        output: &'a Path,
    ) -> BoxFuture<'a, Result<(), SynthesisError>> {
        Box::pin(self.run(text, voice, output))
    }
}

// ── Retry driver ─────────────────────────────────────────────────────────

/// Outcome of [`synthesize_to_file`].
#[derive(Debug)]
pub struct SynthesisReport {
    /// Attempts made, including the successful one.
    pub attempts: u32,
    pub duration_ms: u64,
    /// `Ok` when the audio is at the destination path.
    pub result: Result<(), SynthesisError>,
}

/// Synthesize `text` into `output`, retrying the whole call on failure.
///
/// Each attempt targets a temp file next to `output`; the destination is
/// only touched by the final rename of a successful attempt.
pub async fn synthesize_to_file(
    synthesizer: &dyn SpeechSynthesizer,
    text: &str,
    voice: Voice,
    output: &Path,
    config: &NarrationConfig,
) -> SynthesisReport {
    let start = Instant::now();
    let max_attempts = config.max_retries.saturating_add(1);
    let mut last_err = SynthesisError::Io("synthesis was not attempted".to_string());

    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if let Err(e) = tokio::fs::create_dir_all(&parent).await {
        return SynthesisReport {
            attempts: 0,
            duration_ms: start.elapsed().as_millis() as u64,
            result: Err(SynthesisError::Io(format!("{}: {}", parent.display(), e))),
        };
    }

    for attempt in 1..=max_attempts {
        if attempt > 1 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt - 1);
            warn!(
                "Synthesis: retry {}/{} after {}ms",
                attempt - 1,
                config.max_retries,
                backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match attempt_once(synthesizer, text, voice, output, &parent).await {
            Ok(()) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                info!(
                    "Synthesized {} chars with {} in {}ms ({} attempt(s))",
                    text.chars().count(),
                    voice,
                    duration_ms,
                    attempt
                );
                return SynthesisReport {
                    attempts: attempt,
                    duration_ms,
                    result: Ok(()),
                };
            }
            Err(e) => {
                warn!("Synthesis: attempt {} failed: {}", attempt, e);
                if matches!(e, SynthesisError::ProgramNotFound { .. }) {
                    return SynthesisReport {
                        attempts: attempt,
                        duration_ms: start.elapsed().as_millis() as u64,
                        result: Err(e),
                    };
                }
                if attempt < max_attempts {
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_synthesis_retry(attempt, max_attempts, &e.to_string());
                    }
                }
                last_err = e;
            }
        }
    }

    SynthesisReport {
        attempts: max_attempts,
        duration_ms: start.elapsed().as_millis() as u64,
        result: Err(last_err),
    }
}

/// Wait before retry `retry` (1-indexed): `base_ms * 2^(retry-1)`, saturating.
fn backoff_ms(base_ms: u64, retry: u32) -> u64 {
    2u64.checked_pow(retry.saturating_sub(1))
        .map_or(u64::MAX, |factor| base_ms.saturating_mul(factor))
}

/// One attempt: synthesize into a temp file, then rename over `output`.
async fn attempt_once(
    synthesizer: &dyn SpeechSynthesizer,
    text: &str,
    voice: Voice,
    output: &Path,
    parent: &Path,
) -> Result<(), SynthesisError> {
    let extension = output
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let temp_path = tempfile::Builder::new()
        .prefix(".lessonkit-audio-")
        .suffix(&format!("{extension}.part"))
        .tempfile_in(parent)
        .map_err(|e| SynthesisError::Io(e.to_string()))?
        .into_temp_path();

    // Dropping `temp_path` on any early return deletes the partial file.
    synthesizer.synthesize(text, voice, &temp_path).await?;

    temp_path
        .persist(output)
        .map_err(|e| SynthesisError::Io(format!("{}: {}", output.display(), e.error)))
}
