//! Glossary builder: wrap the external interactive-glossary script.
//!
//! The script does the language work (spaCy term extraction, `.docx`
//! writing); this module stages the input document in a temp directory,
//! makes sure the language model is installed, runs the script with a
//! timeout and copies the finished glossary next to the caller's output.

use crate::config::GlossaryConfig;
use crate::error::LessonKitError;
use crate::output::GlossaryOutput;
use crate::pipeline::input::open_readable;
use std::io::Read;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Instant;
use tempfile::TempDir;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Document types the glossary script accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Docx,
    Txt,
}

impl DocumentKind {
    /// Classify by extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, LessonKitError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "docx" => Ok(DocumentKind::Docx),
            "txt" => Ok(DocumentKind::Txt),
            _ => Err(LessonKitError::UnsupportedDocument {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// `lesson.docx` → `lesson_glossary.docx`.
pub fn glossary_file_name(input_name: &str) -> String {
    let stem = Path::new(input_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("{stem}_glossary.docx")
}

/// Build a glossary for a `.docx` or `.txt` file on disk.
///
/// The glossary lands in `output_dir` as `<stem>_glossary.docx`.
pub async fn build_glossary(
    input_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &GlossaryConfig,
) -> Result<GlossaryOutput, LessonKitError> {
    let input_path = input_path.as_ref();
    check_script(config)?;
    DocumentKind::from_path(input_path)?;

    let mut bytes = Vec::new();
    open_readable(input_path)?
        .read_to_end(&mut bytes)
        .map_err(|e| LessonKitError::Internal(format!("Failed to read input: {e}")))?;

    let file_name = file_name_of(input_path)?;
    run_glossary(&file_name, &bytes, output_dir.as_ref(), config).await
}

/// Build a glossary for document bytes held in memory, e.g. an upload.
///
/// `file_name` supplies the extension and the output name; only its final
/// component is used.
pub async fn build_glossary_from_bytes(
    file_name: &str,
    bytes: &[u8],
    output_dir: impl AsRef<Path>,
    config: &GlossaryConfig,
) -> Result<GlossaryOutput, LessonKitError> {
    check_script(config)?;
    let file_name = file_name_of(Path::new(file_name))?;
    DocumentKind::from_path(Path::new(&file_name))?;
    run_glossary(&file_name, bytes, output_dir.as_ref(), config).await
}

/// Make sure the spaCy model loads, downloading it once if it does not.
pub async fn ensure_language_model(config: &GlossaryConfig) -> Result<(), LessonKitError> {
    let model = &config.language_model;
    let unavailable = |detail: String| LessonKitError::LanguageModelUnavailable {
        model: model.clone(),
        detail,
    };

    let mut check = Command::new(&config.python);
    check
        .arg("-c")
        .arg("import sys, spacy; spacy.load(sys.argv[1])")
        .arg(model);
    match run_captured(check, config.timeout_secs).await {
        Ok(out) if out.status.success() => {
            debug!("spaCy model '{}' is installed", model);
            return Ok(());
        }
        Ok(_) => info!("spaCy model '{}' missing; downloading", model),
        Err(e) => return Err(unavailable(format!("{}: {}", config.python.display(), e))),
    }

    let mut download = Command::new(&config.python);
    download.args(["-m", "spacy", "download"]).arg(model);
    let out = run_captured(download, config.timeout_secs)
        .await
        .map_err(|e| unavailable(e.to_string()))?;
    if !out.status.success() {
        return Err(unavailable(
            String::from_utf8_lossy(&out.stderr).trim().to_string(),
        ));
    }
    info!("Downloaded spaCy model '{}'", model);
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn check_script(config: &GlossaryConfig) -> Result<(), LessonKitError> {
    if config.script.is_file() {
        Ok(())
    } else {
        Err(LessonKitError::GlossaryScriptMissing {
            path: config.script.clone(),
        })
    }
}

fn file_name_of(path: &Path) -> Result<String, LessonKitError> {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| LessonKitError::UnsupportedDocument {
            path: path.to_path_buf(),
        })
}

async fn run_glossary(
    file_name: &str,
    bytes: &[u8],
    output_dir: &Path,
    config: &GlossaryConfig,
) -> Result<GlossaryOutput, LessonKitError> {
    let start = Instant::now();

    if config.ensure_language_model {
        ensure_language_model(config).await?;
    }

    let staging = TempDir::new().map_err(|e| LessonKitError::Internal(e.to_string()))?;
    let in_path = staging.path().join(file_name);
    let out_name = glossary_file_name(file_name);
    let out_path = staging.path().join(&out_name);

    tokio::fs::write(&in_path, bytes)
        .await
        .map_err(|e| LessonKitError::Internal(format!("Failed to stage input: {e}")))?;

    let args = script_args(config, &in_path, &out_path);
    debug!(
        "Running {} {} {}",
        config.python.display(),
        config.script.display(),
        args.join(" ")
    );
    info!("Building glossary '{}' from {}", config.title, file_name);

    let mut cmd = Command::new(&config.python);
    cmd.arg(&config.script).args(&args);
    let result = run_captured(cmd, config.timeout_secs).await;

    let out = match result {
        Ok(out) => out,
        Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
            return Err(LessonKitError::GlossaryTimeout {
                secs: config.timeout_secs,
            })
        }
        Err(e) => {
            return Err(LessonKitError::GlossaryFailed {
                status: None,
                log: format!("{}: {}", config.python.display(), e),
            })
        }
    };

    let log = format!(
        "{}\n{}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    if !out.status.success() || !out_path.is_file() {
        warn!(
            "Glossary script failed (status {:?}, output present: {})",
            out.status.code(),
            out_path.is_file()
        );
        return Err(LessonKitError::GlossaryFailed {
            status: out.status.code(),
            log,
        });
    }

    let dest = output_dir.join(&out_name);
    let write_err = |source| LessonKitError::OutputWriteFailed {
        path: dest.clone(),
        source,
    };
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(write_err)?;
    tokio::fs::copy(&out_path, &dest).await.map_err(write_err)?;

    let duration_ms = start.elapsed().as_millis() as u64;
    info!("Glossary written to {} in {}ms", dest.display(), duration_ms);

    Ok(GlossaryOutput {
        path: dest,
        file_name: out_name,
        log,
        duration_ms,
    })
}

/// Arguments after the script path.
fn script_args(config: &GlossaryConfig, input: &Path, output: &Path) -> Vec<String> {
    let mut args = vec![
        "--input".to_string(),
        input.display().to_string(),
        "--output".to_string(),
        output.display().to_string(),
        "--title".to_string(),
        config.title.clone(),
    ];
    if let Some(terms) = config.always_include_arg() {
        args.push("--always-include".to_string());
        args.push(terms);
    }
    args
}

/// Run to completion capturing output; a timeout comes back as `TimedOut`.
async fn run_captured(mut cmd: Command, timeout_secs: u64) -> std::io::Result<Output> {
    let child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;
    timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
        .await
        .map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("timed out after {timeout_secs}s"),
            )
        })?
}
