//! Pipeline stages for PDF narration.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested on its own and the synthesis backend can be swapped without
//! touching the text stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ reflow ──▶ synthesize
//! (URL/path)  (pdfium)   (cleanup)   (neural TTS)
//! ```
//!
//! 1. [`input`]   — canonicalise the user-supplied path or URL to a local file
//! 2. [`extract`] — read the text layer of selected pages; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`reflow`]  — pure text reconstruction: join lines, repair hyphenation,
//!    collapse whitespace
//! 4. [`synthesize`] — drive the speech synthesizer with retry/backoff; the
//!    only stage that writes output

pub mod extract;
pub mod input;
pub mod reflow;
pub mod synthesize;
