//! # lessonkit
//!
//! Turn lesson documents into study material: narrate a PDF as spoken audio
//! with a neural voice, or build an interactive glossary from a `.docx` /
//! `.txt` lesson.
//!
//! ## Narration Pipeline
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Extract    per-page text layer via pdfium (spawn_blocking)
//!  ├─ 3. Reflow     join lines, repair "inter- esting", collapse whitespace
//!  ├─ 4. Synthesize neural TTS (edge-tts by default), retried as a unit
//!  └─ 5. Outcome    Narrated / NoReadableText / SynthesisFailed
//! ```
//!
//! Scanned PDFs have no text layer. They end as
//! [`NarrationOutcome::NoReadableText`] without ever calling the
//! synthesizer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lessonkit::{narrate, NarrationConfig, NarrationOutcome, Voice};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NarrationConfig::builder().voice(Voice::Sonia).build()?;
//!     match narrate("lesson.pdf", "lesson.mp3", &config).await? {
//!         NarrationOutcome::Narrated(out) => println!("wrote {}", out.audio_path.display()),
//!         other => eprintln!("{}", other.user_message()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Text-only use needs no synthesizer at all:
//!
//! ```rust
//! let text = lessonkit::reconstruct(&[Some("inter-\nesting"), None, Some("test")]);
//! assert_eq!(text, "interesting test");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `lessonkit` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! lessonkit = { version = "0.1", default-features = false }
//! ```
//!
//! ## External Tools
//!
//! | Tool | Used by | Override |
//! |------|---------|----------|
//! | pdfium shared library | text extraction | `PDFIUM_LIB_PATH` |
//! | `edge-tts` | narration | `LESSONKIT_EDGE_TTS`, or a custom [`SpeechSynthesizer`] |
//! | Python + spaCy + glossary script | glossary | `LESSONKIT_PYTHON`, [`GlossaryConfig`] |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod glossary;
pub mod narrate;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    parse_terms, GlossaryConfig, GlossaryConfigBuilder, NarrationConfig, NarrationConfigBuilder,
    PageSelection, Voice,
};
pub use error::{LessonKitError, SynthesisError};
pub use glossary::{build_glossary, build_glossary_from_bytes, glossary_file_name, DocumentKind};
pub use narrate::{
    extract_text, inspect, narrate, narrate_from_bytes, narrate_pages, narrate_sync,
};
pub use output::{
    DocumentMetadata, ExtractedText, ExtractionStats, GlossaryOutput, NarrationOutcome,
    NarrationOutput, PageText,
};
pub use pipeline::reflow::reconstruct;
pub use pipeline::synthesize::{EdgeTtsSynthesizer, SpeechSynthesizer};
pub use progress::{NarrationProgressCallback, NoopProgressCallback, ProgressCallback};
