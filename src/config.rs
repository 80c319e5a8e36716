//! Configuration types for narration and glossary building.
//!
//! Narration behaviour is controlled through [`NarrationConfig`], built via
//! [`NarrationConfigBuilder`]; the glossary builder through
//! [`GlossaryConfig`] and [`GlossaryConfigBuilder`]. Every knob lives in one
//! struct per tool so configs can be shared across tasks and logged whole.

use crate::error::LessonKitError;
use crate::pipeline::synthesize::SpeechSynthesizer;
use crate::progress::ProgressCallback;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

// ── Narration ────────────────────────────────────────────────────────────

/// Configuration for a PDF narration.
///
/// Built via [`NarrationConfig::builder()`] or using
/// [`NarrationConfig::default()`].
///
/// # Example
/// ```rust
/// use lessonkit::{NarrationConfig, Voice};
///
/// let config = NarrationConfig::builder()
///     .voice(Voice::Ryan)
///     .rate("+10%")
///     .max_retries(1)
///     .build()
///     .unwrap();
/// assert_eq!(config.voice, Voice::Ryan);
/// ```
#[derive(Clone)]
pub struct NarrationConfig {
    /// Voice persona used for synthesis. Default: [`Voice::Aria`].
    pub voice: Voice,

    /// Speaking rate adjustment, e.g. `"+10%"` or `"-5%"`. Default: provider default.
    pub rate: Option<String>,

    /// Volume adjustment, e.g. `"+20%"`. Default: provider default.
    pub volume: Option<String>,

    /// Pitch adjustment, e.g. `"-2Hz"`. Default: provider default.
    pub pitch: Option<String>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Timeout for one synthesis attempt in seconds. Default: 300.
    ///
    /// A full lesson can be tens of thousands of characters; the neural
    /// service streams audio roughly in real time, so this is generous.
    pub synthesis_timeout_secs: u64,

    /// Extra synthesis attempts after the first failure. Default: 2.
    ///
    /// Synthesis is retried as a whole: every attempt re-sends the full text
    /// and writes a fresh file. Text extraction is never repeated.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 1000.
    pub retry_backoff_ms: u64,

    /// Path to the `edge-tts` program. If None, `LESSONKIT_EDGE_TTS` or `edge-tts` on PATH.
    pub edge_tts_program: Option<PathBuf>,

    /// Pre-constructed synthesizer. Takes precedence over `edge_tts_program`.
    pub synthesizer: Option<Arc<dyn SpeechSynthesizer>>,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            voice: Voice::default(),
            rate: None,
            volume: None,
            pitch: None,
            pages: PageSelection::default(),
            password: None,
            download_timeout_secs: 120,
            synthesis_timeout_secs: 300,
            max_retries: 2,
            retry_backoff_ms: 1000,
            edge_tts_program: None,
            synthesizer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for NarrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarrationConfig")
            .field("voice", &self.voice)
            .field("rate", &self.rate)
            .field("volume", &self.volume)
            .field("pitch", &self.pitch)
            .field("pages", &self.pages)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("synthesis_timeout_secs", &self.synthesis_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("edge_tts_program", &self.edge_tts_program)
            .field(
                "synthesizer",
                &self.synthesizer.as_ref().map(|s| s.name().to_string()),
            )
            .finish()
    }
}

impl NarrationConfig {
    /// Create a new builder for `NarrationConfig`.
    pub fn builder() -> NarrationConfigBuilder {
        NarrationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`NarrationConfig`].
#[derive(Debug)]
pub struct NarrationConfigBuilder {
    config: NarrationConfig,
}

impl NarrationConfigBuilder {
    pub fn voice(mut self, voice: Voice) -> Self {
        self.config.voice = voice;
        self
    }

    pub fn rate(mut self, rate: impl Into<String>) -> Self {
        self.config.rate = Some(rate.into());
        self
    }

    pub fn volume(mut self, volume: impl Into<String>) -> Self {
        self.config.volume = Some(volume.into());
        self
    }

    pub fn pitch(mut self, pitch: impl Into<String>) -> Self {
        self.config.pitch = Some(pitch.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn synthesis_timeout_secs(mut self, secs: u64) -> Self {
        self.config.synthesis_timeout_secs = secs;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn edge_tts_program(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.edge_tts_program = Some(path.into());
        self
    }

    pub fn synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.config.synthesizer = Some(synthesizer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<NarrationConfig, LessonKitError> {
        let c = &self.config;
        check_prosody("rate", c.rate.as_deref(), &RE_PERCENT, "+10%")?;
        check_prosody("volume", c.volume.as_deref(), &RE_PERCENT, "-20%")?;
        check_prosody("pitch", c.pitch.as_deref(), &RE_HERTZ, "+5Hz")?;
        if c.synthesis_timeout_secs == 0 {
            return Err(LessonKitError::InvalidConfig(
                "Synthesis timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_retries > MAX_RETRIES {
            return Err(LessonKitError::InvalidConfig(format!(
                "Max retries must be ≤ {MAX_RETRIES}, got {}",
                c.max_retries
            )));
        }
        Ok(self.config)
    }
}

/// Upper bound accepted by [`NarrationConfigBuilder::max_retries`].
pub const MAX_RETRIES: u32 = 10;

static RE_PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]\d{1,3}%$").unwrap());
static RE_HERTZ: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]\d{1,3}Hz$").unwrap());

fn check_prosody(
    name: &str,
    value: Option<&str>,
    pattern: &Regex,
    example: &str,
) -> Result<(), LessonKitError> {
    match value {
        Some(v) if !pattern.is_match(v) => Err(LessonKitError::InvalidConfig(format!(
            "{name} must look like '{example}', got '{v}'"
        ))),
        _ => Ok(()),
    }
}

// ── Voice personas ───────────────────────────────────────────────────────

/// Neural voice personas offered for narration.
///
/// The provider identifier (e.g. `en-US-AriaNeural`) is opaque to the rest
/// of the pipeline; only the synthesizer interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Voice {
    /// US English, female. (default)
    #[default]
    Aria,
    /// US English, male.
    Guy,
    /// US English, female.
    Jenny,
    /// British English, female.
    Sonia,
    /// British English, male.
    Ryan,
    /// Australian English, female.
    Natasha,
}

impl Voice {
    /// Every persona, in display order.
    pub const ALL: [Voice; 6] = [
        Voice::Aria,
        Voice::Guy,
        Voice::Jenny,
        Voice::Sonia,
        Voice::Ryan,
        Voice::Natasha,
    ];

    /// Identifier understood by the TTS provider.
    pub fn id(&self) -> &'static str {
        match self {
            Voice::Aria => "en-US-AriaNeural",
            Voice::Guy => "en-US-GuyNeural",
            Voice::Jenny => "en-US-JennyNeural",
            Voice::Sonia => "en-GB-SoniaNeural",
            Voice::Ryan => "en-GB-RyanNeural",
            Voice::Natasha => "en-AU-NatashaNeural",
        }
    }

    /// Short name used on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Voice::Aria => "aria",
            Voice::Guy => "guy",
            Voice::Jenny => "jenny",
            Voice::Sonia => "sonia",
            Voice::Ryan => "ryan",
            Voice::Natasha => "natasha",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Voice::Aria => "Aria (US, female)",
            Voice::Guy => "Guy (US, male)",
            Voice::Jenny => "Jenny (US, female)",
            Voice::Sonia => "Sonia (UK, female)",
            Voice::Ryan => "Ryan (UK, male)",
            Voice::Natasha => "Natasha (AU, female)",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Voice {
    type Err = LessonKitError;

    /// Accepts the short name (`sonia`) or the provider id (`en-GB-SoniaNeural`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Voice::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(wanted) || v.id().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let names: Vec<&str> = Voice::ALL.iter().map(Voice::name).collect();
                LessonKitError::InvalidConfig(format!(
                    "Unknown voice '{wanted}'. Choose one of: {}",
                    names.join(", ")
                ))
            })
    }
}

// ── Page selection ───────────────────────────────────────────────────────

/// Specifies which pages of the PDF to read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Read all pages (default).
    #[default]
    All,
    /// Read a single page (1-indexed).
    Single(usize),
    /// Read a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Read specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

impl FromStr for PageSelection {
    type Err = LessonKitError;

    /// Parse `all`, `5`, `3-15` or `1,3,5,7`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let invalid = |msg: String| LessonKitError::InvalidConfig(msg);
        let page = |p: &str| -> Result<usize, LessonKitError> {
            let n: usize = p
                .trim()
                .parse()
                .map_err(|_| invalid(format!("Invalid page number: '{}'", p.trim())))?;
            if n < 1 {
                return Err(invalid(format!("Pages are 1-indexed, minimum is 1 (got {n})")));
            }
            Ok(n)
        };

        if s == "all" {
            return Ok(PageSelection::All);
        }

        if let Some((start, end)) = s.split_once('-') {
            let (start, end) = (page(start)?, page(end)?);
            if start > end {
                return Err(invalid(format!(
                    "Invalid page range '{start}-{end}': start must be <= end"
                )));
            }
            return Ok(PageSelection::Range(start, end));
        }

        if s.contains(',') {
            let pages = s.split(',').map(page).collect::<Result<Vec<_>, _>>()?;
            return Ok(PageSelection::Set(pages));
        }

        Ok(PageSelection::Single(page(&s)?))
    }
}

// ── Glossary ─────────────────────────────────────────────────────────────

/// Configuration for the glossary builder.
#[derive(Debug, Clone)]
pub struct GlossaryConfig {
    /// Document title written into the glossary. Required, non-blank.
    pub title: String,

    /// Terms the glossary must always contain.
    pub always_include: Vec<String>,

    /// Glossary script. Default: `interactive_glossary_builder.py`.
    pub script: PathBuf,

    /// Python interpreter. Default: `LESSONKIT_PYTHON` or `python3`.
    pub python: PathBuf,

    /// Check for (and download) the spaCy model before running. Default: true.
    pub ensure_language_model: bool,

    /// spaCy model the script loads. Default: `en_core_web_sm`.
    pub language_model: String,

    /// Timeout for the glossary script in seconds. Default: 600.
    ///
    /// A first run loads the language model and typically needs 15–45 s.
    pub timeout_secs: u64,
}

impl Default for GlossaryConfig {
    fn default() -> Self {
        Self {
            title: "My Lesson".to_string(),
            always_include: Vec::new(),
            script: PathBuf::from("interactive_glossary_builder.py"),
            python: std::env::var_os("LESSONKIT_PYTHON")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("python3")),
            ensure_language_model: true,
            language_model: "en_core_web_sm".to_string(),
            timeout_secs: 600,
        }
    }
}

impl GlossaryConfig {
    /// Create a new builder for `GlossaryConfig`.
    pub fn builder() -> GlossaryConfigBuilder {
        GlossaryConfigBuilder {
            config: Self::default(),
        }
    }

    /// The `--always-include` argument value, or None when there are no terms.
    pub fn always_include_arg(&self) -> Option<String> {
        if self.always_include.is_empty() {
            None
        } else {
            Some(self.always_include.join(","))
        }
    }
}

/// Builder for [`GlossaryConfig`].
#[derive(Debug)]
pub struct GlossaryConfigBuilder {
    config: GlossaryConfig,
}

impl GlossaryConfigBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    pub fn always_include<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.always_include = terms.into_iter().map(Into::into).collect();
        self
    }

    pub fn script(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.script = path.into();
        self
    }

    pub fn python(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.python = path.into();
        self
    }

    pub fn ensure_language_model(mut self, v: bool) -> Self {
        self.config.ensure_language_model = v;
        self
    }

    pub fn language_model(mut self, model: impl Into<String>) -> Self {
        self.config.language_model = model.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<GlossaryConfig, LessonKitError> {
        let title = self.config.title.trim();
        if title.is_empty() {
            return Err(LessonKitError::InvalidConfig(
                "Document title must not be empty".into(),
            ));
        }
        self.config.title = title.to_string();
        self.config.always_include = self
            .config
            .always_include
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if self.config.timeout_secs == 0 {
            return Err(LessonKitError::InvalidConfig(
                "Glossary timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Split a comma-separated term list, dropping blanks.
pub fn parse_terms(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narration_defaults() {
        let c = NarrationConfig::default();
        assert_eq!(c.voice, Voice::Aria);
        assert_eq!(c.max_retries, 2);
        assert_eq!(c.pages, PageSelection::All);
        assert!(c.synthesizer.is_none());
    }

    #[test]
    fn builder_rejects_bad_rate() {
        let err = NarrationConfig::builder().rate("fast").build().unwrap_err();
        assert!(err.to_string().contains("rate"), "got: {err}");
    }

    #[test]
    fn builder_caps_max_retries() {
        let err = NarrationConfig::builder()
            .max_retries(u32::MAX)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Max retries"), "got: {err}");
        assert!(NarrationConfig::builder()
            .max_retries(MAX_RETRIES)
            .build()
            .is_ok());
    }

    #[test]
    fn builder_accepts_signed_prosody() {
        let c = NarrationConfig::builder()
            .rate("-10%")
            .volume("+0%")
            .pitch("+5Hz")
            .build()
            .unwrap();
        assert_eq!(c.pitch.as_deref(), Some("+5Hz"));
    }

    #[test]
    fn builder_rejects_unsigned_pitch() {
        assert!(NarrationConfig::builder().pitch("5Hz").build().is_err());
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        assert!(NarrationConfig::builder()
            .synthesis_timeout_secs(0)
            .build()
            .is_err());
    }

    #[test]
    fn voice_parses_name_and_id() {
        assert_eq!("sonia".parse::<Voice>().unwrap(), Voice::Sonia);
        assert_eq!("RYAN".parse::<Voice>().unwrap(), Voice::Ryan);
        assert_eq!("en-AU-NatashaNeural".parse::<Voice>().unwrap(), Voice::Natasha);
        let err = "robot".parse::<Voice>().unwrap_err().to_string();
        assert!(err.contains("aria"), "got: {err}");
    }

    #[test]
    fn voice_ids_are_unique() {
        let mut ids: Vec<&str> = Voice::ALL.iter().map(Voice::id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), Voice::ALL.len());
    }

    #[test]
    fn voice_display_is_provider_id() {
        assert_eq!(Voice::Guy.to_string(), "en-US-GuyNeural");
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(5), vec![0, 1, 2, 3, 4]);
        assert_eq!(PageSelection::Single(3).to_indices(5), vec![2]);
        assert_eq!(PageSelection::Single(6).to_indices(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 4).to_indices(5), vec![1, 2, 3]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3]).to_indices(5),
            vec![0, 2] // deduplicated and sorted
        );
    }

    #[test]
    fn page_selection_parses() {
        assert_eq!("all".parse::<PageSelection>().unwrap(), PageSelection::All);
        assert_eq!("5".parse::<PageSelection>().unwrap(), PageSelection::Single(5));
        assert_eq!(
            " 3-15 ".parse::<PageSelection>().unwrap(),
            PageSelection::Range(3, 15)
        );
        assert_eq!(
            "1,3, 5".parse::<PageSelection>().unwrap(),
            PageSelection::Set(vec![1, 3, 5])
        );
        assert!("0".parse::<PageSelection>().is_err());
        assert!("9-2".parse::<PageSelection>().is_err());
        assert!("x".parse::<PageSelection>().is_err());
    }

    #[test]
    fn glossary_builder_trims_title_and_terms() {
        let c = GlossaryConfig::builder()
            .title("  Photosynthesis ")
            .always_include(["chlorophyll", " ", " stomata "])
            .build()
            .unwrap();
        assert_eq!(c.title, "Photosynthesis");
        assert_eq!(c.always_include, vec!["chlorophyll", "stomata"]);
        assert_eq!(c.always_include_arg().as_deref(), Some("chlorophyll,stomata"));
    }

    #[test]
    fn glossary_builder_rejects_blank_title() {
        assert!(GlossaryConfig::builder().title("   ").build().is_err());
    }

    #[test]
    fn glossary_without_terms_has_no_arg() {
        let c = GlossaryConfig::builder().build().unwrap();
        assert_eq!(c.title, "My Lesson");
        assert!(c.always_include_arg().is_none());
    }

    #[test]
    fn parse_terms_drops_blanks() {
        assert_eq!(parse_terms("a, b,,c ,"), vec!["a", "b", "c"]);
        assert!(parse_terms("  ").is_empty());
    }
}
