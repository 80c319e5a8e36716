//! Output types produced by the narration and glossary pipelines.

use crate::config::Voice;
use crate::error::SynthesisError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Extracted text of one PDF page.
///
/// `text` is `None` when the page yielded no extractable text (a scanned
/// image page, an empty page, or a page whose text layer could not be read).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Raw text as returned by the extractor, line breaks included.
    pub text: Option<String>,
}

impl PageText {
    pub fn new(page_num: usize, text: Option<String>) -> Self {
        Self { page_num, text }
    }

    /// Whether this page contributed any text at all.
    pub fn has_text(&self) -> bool {
        self.text.is_some()
    }

    /// Character count of the raw text (0 when absent).
    pub fn char_count(&self) -> usize {
        self.text.as_ref().map_or(0, |t| t.chars().count())
    }
}

/// PDF document metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Counters collected while extracting and cleaning text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages selected for extraction.
    pub selected_pages: usize,
    /// Selected pages that yielded text.
    pub pages_with_text: usize,
    /// Selected pages that yielded nothing.
    pub pages_without_text: usize,
    /// Characters across all raw page texts.
    pub raw_chars: usize,
    /// Characters in the cleaned text.
    pub cleaned_chars: usize,
    pub extraction_duration_ms: u64,
}

impl ExtractionStats {
    /// Compute the page and character counters for a set of extracted pages.
    pub fn from_pages(total_pages: usize, pages: &[PageText], cleaned: &str) -> Self {
        let pages_with_text = pages.iter().filter(|p| p.has_text()).count();
        Self {
            total_pages,
            selected_pages: pages.len(),
            pages_with_text,
            pages_without_text: pages.len() - pages_with_text,
            raw_chars: pages.iter().map(PageText::char_count).sum(),
            cleaned_chars: cleaned.chars().count(),
            extraction_duration_ms: 0,
        }
    }
}

/// Result of [`crate::narrate::extract_text`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedText {
    /// Cleaned, speakable text. Empty when the document has no readable text.
    pub text: String,
    /// Raw per-page texts in document order.
    pub pages: Vec<PageText>,
    pub metadata: DocumentMetadata,
    pub stats: ExtractionStats,
}

impl ExtractedText {
    /// `true` when nothing speakable survived cleanup.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A successful narration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationOutput {
    /// Where the audio file was written.
    pub audio_path: PathBuf,
    pub voice: Voice,
    /// Characters sent to the synthesizer.
    pub text_chars: usize,
    /// Synthesis attempts used (1 when the first attempt succeeded).
    pub attempts: u32,
    pub synthesis_duration_ms: u64,
    /// Present when the text came from a PDF extracted by this crate.
    pub extraction: Option<ExtractionStats>,
}

/// Terminal state of a narration run.
///
/// Input and extraction failures are fatal and come back as
/// `Err(LessonKitError)` before any of these states is reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NarrationOutcome {
    /// Audio was written.
    Narrated(NarrationOutput),
    /// Every page was absent or whitespace-only; synthesis was not attempted.
    NoReadableText {
        /// Pages that were examined.
        pages: usize,
    },
    /// Text was ready but every synthesis attempt failed.
    SynthesisFailed {
        attempts: u32,
        /// Error of the final attempt.
        error: SynthesisError,
    },
}

impl NarrationOutcome {
    /// Short machine-friendly label, used in progress events and logs.
    pub fn label(&self) -> &'static str {
        match self {
            NarrationOutcome::Narrated(_) => "narrated",
            NarrationOutcome::NoReadableText { .. } => "no_readable_text",
            NarrationOutcome::SynthesisFailed { .. } => "synthesis_failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, NarrationOutcome::Narrated(_))
    }

    /// The audio output, if narration succeeded.
    pub fn output(&self) -> Option<&NarrationOutput> {
        match self {
            NarrationOutcome::Narrated(out) => Some(out),
            _ => None,
        }
    }

    /// A message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            NarrationOutcome::Narrated(out) => format!(
                "Narrated {} characters with {} → {}",
                out.text_chars,
                out.voice.label(),
                out.audio_path.display()
            ),
            NarrationOutcome::NoReadableText { pages } => format!(
                "No readable text found in {pages} page(s). \
                 The PDF may be scanned images; run it through OCR first."
            ),
            NarrationOutcome::SynthesisFailed { attempts, error } => {
                format!("Speech synthesis failed after {attempts} attempt(s): {error}")
            }
        }
    }
}

/// Result of [`crate::glossary::build_glossary`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossaryOutput {
    /// Final location of the glossary document.
    pub path: PathBuf,
    /// File name offered to the user, e.g. `lesson_glossary.docx`.
    pub file_name: String,
    /// Combined stdout and stderr of the glossary script.
    pub log: String,
    pub duration_ms: u64,
}
