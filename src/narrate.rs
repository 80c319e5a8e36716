//! Narration entry points: PDF in, audio file out.
//!
//! The pipeline runs in two halves. Extraction (input resolution, pdfium,
//! text reconstruction) either succeeds or fails fatally with
//! `Err(LessonKitError)`. Synthesis never fails the call: its result is
//! folded into a [`NarrationOutcome`] together with the "nothing to read"
//! case, so callers can tell an unreadable PDF from a voice-service failure.

use crate::config::NarrationConfig;
use crate::error::LessonKitError;
use crate::output::{
    DocumentMetadata, ExtractedText, ExtractionStats, NarrationOutcome, NarrationOutput, PageText,
};
use crate::pipeline::synthesize::{synthesize_to_file, EdgeTtsSynthesizer, SpeechSynthesizer};
use crate::pipeline::{extract, input, reflow};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract and clean the speakable text of a PDF file or URL.
///
/// # Errors
/// Fatal input and PDF errors only. A document without readable text is
/// `Ok` with an empty [`ExtractedText::text`].
pub async fn extract_text(
    input_str: impl AsRef<str>,
    config: &NarrationConfig,
) -> Result<ExtractedText, LessonKitError> {
    let start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Extracting text: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();

    let metadata = extract::extract_metadata(&pdf_path, config.password.as_deref()).await?;
    let extracted =
        extract::extract_page_texts(&pdf_path, config.password.as_deref(), &config.pages).await?;
    debug!(
        "Selected {} of {} pages",
        extracted.pages.len(),
        extracted.total_pages
    );

    report_pages(&extracted.pages, config);

    let text = reflow::reconstruct_pages(&extracted.pages);
    let mut stats = ExtractionStats::from_pages(extracted.total_pages, &extracted.pages, &text);
    stats.extraction_duration_ms = start.elapsed().as_millis() as u64;

    info!(
        "Extracted {} chars from {}/{} pages in {}ms",
        stats.cleaned_chars, stats.pages_with_text, stats.selected_pages, stats.extraction_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_text_ready(stats.cleaned_chars);
    }

    Ok(ExtractedText {
        text,
        pages: extracted.pages,
        metadata,
        stats,
    })
}

/// Narrate a PDF file or URL into an audio file.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(NarrationOutcome)` once extraction succeeded, whatever happened to
/// synthesis. Synthesis is skipped entirely when no text survived cleanup.
///
/// # Errors
/// `Err(LessonKitError)` for fatal input/PDF errors, before any synthesis.
pub async fn narrate(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &NarrationConfig,
) -> Result<NarrationOutcome, LessonKitError> {
    let extracted = extract_text(input_str, config).await?;
    let pages = extracted.stats.selected_pages;
    Ok(speak(
        &extracted.text,
        output_path.as_ref(),
        config,
        pages,
        Some(extracted.stats),
    )
    .await)
}

/// Narrate text the caller already extracted, one entry per page.
///
/// Runs the text reconstruction and synthesis only; `pages` with `None`
/// text count as absent.
pub async fn narrate_pages(
    pages: &[PageText],
    output_path: impl AsRef<Path>,
    config: &NarrationConfig,
) -> NarrationOutcome {
    report_pages(pages, config);
    let text = reflow::reconstruct_pages(pages);
    if let Some(ref cb) = config.progress_callback {
        cb.on_text_ready(text.chars().count());
    }
    speak(&text, output_path.as_ref(), config, pages.len(), None).await
}

/// Narrate PDF bytes held in memory.
///
/// The bytes are written to a managed [`tempfile`] that is removed on return.
pub async fn narrate_from_bytes(
    bytes: &[u8],
    output_path: impl AsRef<Path>,
    config: &NarrationConfig,
) -> Result<NarrationOutcome, LessonKitError> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| LessonKitError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| LessonKitError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    narrate(&path, output_path, config).await
}

/// Synchronous wrapper around [`narrate`].
///
/// Creates a temporary tokio runtime internally; do not call from async code.
pub fn narrate_sync(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &NarrationConfig,
) -> Result<NarrationOutcome, LessonKitError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| LessonKitError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(narrate(input_str, output_path, config))
}

/// Read PDF metadata without extracting text.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentMetadata, LessonKitError> {
    let resolved = input::resolve_input(input_str.as_ref(), 120).await?;
    extract::extract_metadata(resolved.path(), None).await
}

/// Pick the synthesizer, from most-specific to least-specific.
///
/// 1. `config.synthesizer`, used as-is.
/// 2. `edge-tts` at `config.edge_tts_program`.
/// 3. `edge-tts` at `$LESSONKIT_EDGE_TTS`.
/// 4. `edge-tts` on `PATH`.
pub fn resolve_synthesizer(config: &NarrationConfig) -> Arc<dyn SpeechSynthesizer> {
    match config.synthesizer {
        Some(ref synth) => Arc::clone(synth),
        None => Arc::new(EdgeTtsSynthesizer::from_config(config)),
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn report_pages(pages: &[PageText], config: &NarrationConfig) {
    let Some(ref cb) = config.progress_callback else {
        return;
    };
    let total = pages.len();
    cb.on_extraction_start(total);
    for page in pages {
        match page.text {
            Some(_) => cb.on_page_extracted(page.page_num, total, page.char_count()),
            None => cb.on_page_empty(page.page_num, total),
        }
    }
}

/// Hand cleaned text to the synthesizer, or stop when there is none.
async fn speak(
    text: &str,
    output: &Path,
    config: &NarrationConfig,
    pages: usize,
    extraction: Option<ExtractionStats>,
) -> NarrationOutcome {
    let outcome = if text.is_empty() {
        warn!("No readable text in {} page(s); skipping synthesis", pages);
        NarrationOutcome::NoReadableText { pages }
    } else {
        let chars = text.chars().count();
        if let Some(ref cb) = config.progress_callback {
            cb.on_synthesis_start(config.voice, chars);
        }

        let synthesizer = resolve_synthesizer(config);
        debug!("Using synthesizer: {}", synthesizer.name());
        let report =
            synthesize_to_file(synthesizer.as_ref(), text, config.voice, output, config).await;

        match report.result {
            Ok(()) => NarrationOutcome::Narrated(NarrationOutput {
                audio_path: output.to_path_buf(),
                voice: config.voice,
                text_chars: chars,
                attempts: report.attempts,
                synthesis_duration_ms: report.duration_ms,
                extraction,
            }),
            Err(error) => NarrationOutcome::SynthesisFailed {
                attempts: report.attempts,
                error,
            },
        }
    };

    info!("Narration finished: {}", outcome.label());
    if let Some(ref cb) = config.progress_callback {
        cb.on_narration_complete(outcome.label());
    }
    outcome
}
