//! Error types for the lessonkit library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`LessonKitError`] — **Fatal**: the pipeline cannot proceed at all
//!   (bad input file, wrong password, glossary script missing). Returned as
//!   `Err(LessonKitError)` from the top-level entry points.
//!
//! * [`SynthesisError`] — a single speech-synthesis attempt failed (program
//!   missing, non-zero exit, timeout). Synthesis failures are not fatal
//!   errors of the narration call: they are reported inside
//!   [`crate::output::NarrationOutcome::SynthesisFailed`] alongside the
//!   number of attempts made, so callers can tell "the PDF was unreadable"
//!   apart from "the voice service failed".

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the lessonkit library.
#[derive(Debug, Error)]
pub enum LessonKitError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection matched no page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Text extraction needs the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or its directory).\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Glossary errors ───────────────────────────────────────────────────
    /// The document type is not accepted by the glossary builder.
    #[error("Unsupported document '{path}': expected a .docx or .txt file")]
    UnsupportedDocument { path: PathBuf },

    /// The external glossary script is not where the config says it is.
    #[error("Cannot find glossary script '{path}'.\nPlace it next to the working directory or pass --script.")]
    GlossaryScriptMissing { path: PathBuf },

    /// The spaCy language model is absent and could not be downloaded.
    #[error("Could not download spaCy model '{model}' automatically. Please install '{model}'.\n{detail}")]
    LanguageModelUnavailable { model: String, detail: String },

    /// The glossary script exited with an error or produced no file.
    #[error("Something went wrong while generating the glossary (exit status: {})", status.map_or_else(|| "none".to_string(), |s| s.to_string()))]
    GlossaryFailed { status: Option<i32>, log: String },

    /// The glossary script ran longer than the configured timeout.
    #[error("Glossary generation timed out after {secs}s")]
    GlossaryTimeout { secs: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failed speech-synthesis attempt.
///
/// Cloneable and serialisable so it can be stored in
/// [`crate::output::NarrationOutcome`] and emitted as JSON.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum SynthesisError {
    /// The synthesis program is not installed or not on `PATH`.
    #[error("Speech synthesizer '{program}' not found.\nInstall it with: pip install edge-tts")]
    ProgramNotFound { program: String },

    /// The synthesis program could not be started.
    #[error("Failed to start speech synthesizer '{program}': {detail}")]
    Spawn { program: String, detail: String },

    /// The synthesis program ran but reported an error.
    #[error("Speech synthesis failed (exit status: {}): {stderr}", status.map_or_else(|| "none".to_string(), |s| s.to_string()))]
    Failed { status: Option<i32>, stderr: String },

    /// The synthesis call took longer than allowed.
    #[error("Speech synthesis timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The synthesis call succeeded but wrote no audio.
    #[error("Speech synthesis produced no audio at '{path}'")]
    EmptyAudio { path: PathBuf },

    /// Reading or writing the intermediate files failed.
    #[error("I/O error during speech synthesis: {0}")]
    Io(String),
}
