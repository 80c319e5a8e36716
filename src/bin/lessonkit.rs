//! CLI binary for lessonkit.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `NarrationConfig` / `GlossaryConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use lessonkit::{
    build_glossary, extract_text, inspect, narrate, parse_terms, GlossaryConfig, LessonKitError,
    NarrationConfig, NarrationOutcome, NarrationProgressCallback, PageSelection, ProgressCallback,
    Voice,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

fn spinner(prefix: &str, msg: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS),
    );
    bar.set_prefix(prefix.to_string());
    bar.set_message(msg.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a page bar while text is read, then a
/// spinner while the voice service works.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: spinner("Preparing", "Opening PDF…"),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Reading");
    }
}

impl NarrationProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
    }

    fn on_page_extracted(&self, page_num: usize, total: usize, chars: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{chars:>6} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_page_empty(&self, page_num: usize, total: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            yellow("○"),
            page_num,
            total,
            dim("no text"),
        ));
        self.bar.inc(1);
    }

    fn on_synthesis_start(&self, voice: Voice, chars: usize) {
        self.bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        self.bar.set_prefix("Speaking");
        self.bar
            .set_message(format!("{} chars with {}", chars, voice.label()));
    }

    fn on_synthesis_retry(&self, attempt: u32, max: u32, error: &str) {
        let first_line = error.lines().next().unwrap_or(error);
        self.bar.println(format!(
            "  {} Attempt {}/{} failed: {}",
            yellow("⚠"),
            attempt,
            max,
            red(first_line),
        ));
    }

    fn on_narration_complete(&self, _outcome: &str) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Narrate a lesson with the default voice (Aria)
  lessonkit narrate lesson.pdf

  # British voice, slightly slower, to a chosen file
  lessonkit narrate lesson.pdf --voice sonia --rate=-10% -o lesson.mp3

  # Only chapter two
  lessonkit narrate --pages 12-30 textbook.pdf -o chapter2.mp3

  # Narrate from a URL
  lessonkit narrate https://example.org/handout.pdf

  # Show the cleaned text that would be spoken
  lessonkit extract lesson.pdf -o lesson.txt

  # Inspect PDF metadata
  lessonkit inspect --json lesson.pdf

  # Build an interactive glossary
  lessonkit glossary notes.docx --title "Cell Biology" --always-include "mitosis, ATP"

EXIT CODES:
  0  success
  1  error (bad input, synthesis failed, glossary failed)
  2  the PDF has no readable text (scanned images; run OCR first)

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH      Path to libpdfium or the directory holding it
  LESSONKIT_EDGE_TTS   Path to the edge-tts program
  LESSONKIT_PYTHON     Python interpreter for the glossary builder
  RUST_LOG             Override log filter (e.g. lessonkit=debug)

SETUP:
  pip install edge-tts                         # narration
  pip install spacy python-docx                # glossary
"#;

/// Narrate lesson PDFs and build interactive glossaries.
#[derive(Parser, Debug)]
#[command(
    name = "lessonkit",
    version,
    about = "Narrate lesson PDFs with neural voices and build interactive glossaries",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "LESSONKIT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "LESSONKIT_QUIET")]
    quiet: bool,

    /// Disable progress bars and spinners.
    #[arg(long, global = true, env = "LESSONKIT_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read a PDF aloud into an audio file.
    Narrate(NarrateArgs),
    /// Print the cleaned, speakable text of a PDF.
    Extract(ExtractArgs),
    /// Print PDF metadata only.
    Inspect(InspectArgs),
    /// List the available voices.
    Voices {
        /// Output JSON.
        #[arg(long)]
        json: bool,
    },
    /// Build an interactive glossary (.docx) from a .docx or .txt lesson.
    Glossary(GlossaryArgs),
}

impl Command {
    fn json(&self) -> bool {
        match self {
            Command::Narrate(a) => a.json,
            Command::Extract(a) => a.json,
            Command::Inspect(a) => a.json,
            Command::Voices { json } => *json,
            Command::Glossary(a) => a.json,
        }
    }
}

/// Options shared by every command that reads a PDF.
#[derive(Args, Debug)]
struct PdfArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "LESSONKIT_PAGES", default_value = "all")]
    pages: PageSelection,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "LESSONKIT_PASSWORD")]
    password: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "LESSONKIT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(Args, Debug)]
struct NarrateArgs {
    #[command(flatten)]
    pdf: PdfArgs,

    /// Audio file to write. Default: <input stem>.mp3 in the current directory.
    #[arg(short, long, env = "LESSONKIT_OUTPUT")]
    output: Option<PathBuf>,

    /// Voice: aria, guy, jenny, sonia, ryan, natasha (or a provider id).
    #[arg(long, env = "LESSONKIT_VOICE", default_value = "aria")]
    voice: Voice,

    /// Speaking rate, e.g. +10% or -5% (use --rate=-5%).
    #[arg(long, env = "LESSONKIT_RATE", allow_hyphen_values = true)]
    rate: Option<String>,

    /// Volume, e.g. +20%.
    #[arg(long, env = "LESSONKIT_VOLUME", allow_hyphen_values = true)]
    volume: Option<String>,

    /// Pitch, e.g. -2Hz.
    #[arg(long, env = "LESSONKIT_PITCH", allow_hyphen_values = true)]
    pitch: Option<String>,

    /// Path to the edge-tts program.
    #[arg(long, env = "LESSONKIT_EDGE_TTS")]
    edge_tts: Option<PathBuf>,

    /// Extra synthesis attempts after a failure.
    #[arg(
        long,
        env = "LESSONKIT_MAX_RETRIES",
        default_value_t = 2,
        value_parser = clap::value_parser!(u32).range(0..=10)
    )]
    max_retries: u32,

    /// Timeout for one synthesis attempt in seconds.
    #[arg(long, env = "LESSONKIT_SYNTHESIS_TIMEOUT", default_value_t = 300)]
    synthesis_timeout: u64,

    /// Output the outcome as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    #[command(flatten)]
    pdf: PdfArgs,

    /// Write text to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output structured JSON (text, pages, metadata, stats).
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Output JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct GlossaryArgs {
    /// Lesson document (.docx or .txt).
    input: PathBuf,

    /// Document title written into the glossary.
    #[arg(long, env = "LESSONKIT_GLOSSARY_TITLE", default_value = "My Lesson")]
    title: String,

    /// Comma-separated terms the glossary must always include.
    #[arg(long, default_value = "")]
    always_include: String,

    /// Directory for <stem>_glossary.docx.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Glossary builder script.
    #[arg(
        long,
        env = "LESSONKIT_GLOSSARY_SCRIPT",
        default_value = "interactive_glossary_builder.py"
    )]
    script: PathBuf,

    /// Python interpreter.
    #[arg(long, env = "LESSONKIT_PYTHON", default_value = "python3")]
    python: PathBuf,

    /// Do not check for (or download) the spaCy language model.
    #[arg(long)]
    skip_model_check: bool,

    /// Timeout for the glossary script in seconds.
    #[arg(long, env = "LESSONKIT_GLOSSARY_TIMEOUT", default_value_t = 600)]
    timeout: u64,

    /// Output the result as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would tear through the progress bar; keep errors only
    // while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.command.json();
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Narrate(args) => run_narrate(&cli, args, show_progress).await,
        Command::Extract(args) => run_extract(&cli, args).await,
        Command::Inspect(args) => run_inspect(args).await,
        Command::Voices { json } => run_voices(*json),
        Command::Glossary(args) => run_glossary(&cli, args, show_progress).await,
    }
}

async fn run_narrate(cli: &Cli, args: &NarrateArgs, show_progress: bool) -> Result<ExitCode> {
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn NarrationProgressCallback>)
    } else {
        None
    };
    let config = build_narration_config(args, progress_cb)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_audio_path(&args.pdf.input));

    let outcome = narrate(&args.pdf.input, &output, &config)
        .await
        .context("Narration failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?
        );
    } else if !cli.quiet || !outcome.is_success() {
        let mark = match outcome {
            NarrationOutcome::Narrated(_) => green("✔"),
            NarrationOutcome::NoReadableText { .. } => yellow("⚠"),
            NarrationOutcome::SynthesisFailed { .. } => red("✘"),
        };
        eprintln!("{} {}", mark, outcome.user_message());
        if let Some(out) = outcome.output() {
            let extraction = out
                .extraction
                .as_ref()
                .map(|s| format!("{}/{} pages read  ", s.pages_with_text, s.selected_pages))
                .unwrap_or_default();
            eprintln!(
                "   {}{}",
                dim(&extraction),
                dim(&format!(
                    "{} attempt(s)  {}ms synthesis",
                    out.attempts, out.synthesis_duration_ms
                )),
            );
        }
    }

    Ok(match outcome {
        NarrationOutcome::Narrated(_) => ExitCode::SUCCESS,
        NarrationOutcome::NoReadableText { .. } => ExitCode::from(2),
        NarrationOutcome::SynthesisFailed { .. } => ExitCode::FAILURE,
    })
}

async fn run_extract(cli: &Cli, args: &ExtractArgs) -> Result<ExitCode> {
    let config = NarrationConfig::builder()
        .pages(args.pdf.pages.clone())
        .download_timeout_secs(args.pdf.download_timeout);
    let config = match args.pdf.password {
        Some(ref pwd) => config.password(pwd),
        None => config,
    }
    .build()
    .context("Invalid configuration")?;

    let extracted = extract_text(&args.pdf.input, &config)
        .await
        .context("Text extraction failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&extracted).context("Failed to serialise output")?
        );
    } else if let Some(ref path) = args.output {
        write_atomic(path, &extracted.text).await?;
        if !cli.quiet {
            eprintln!(
                "{}  {} chars from {}/{} pages  →  {}",
                green("✔"),
                extracted.stats.cleaned_chars,
                extracted.stats.pages_with_text,
                extracted.stats.selected_pages,
                bold(&path.display().to_string()),
            );
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(extracted.text.as_bytes())
            .and_then(|_| handle.write_all(b"\n"))
            .context("Failed to write to stdout")?;
    }

    if extracted.is_empty() {
        if !cli.quiet && !args.json {
            eprintln!(
                "{} {}",
                yellow("⚠"),
                NarrationOutcome::NoReadableText {
                    pages: extracted.stats.selected_pages
                }
                .user_message()
            );
        }
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_inspect(args: &InspectArgs) -> Result<ExitCode> {
    let meta = inspect(&args.input).await.context("Failed to inspect PDF")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
        );
        return Ok(ExitCode::SUCCESS);
    }

    println!("File:         {}", args.input);
    if let Some(ref t) = meta.title {
        println!("Title:        {}", t);
    }
    if let Some(ref a) = meta.author {
        println!("Author:       {}", a);
    }
    if let Some(ref s) = meta.subject {
        println!("Subject:      {}", s);
    }
    println!("Pages:        {}", meta.page_count);
    println!("PDF Version:  {}", meta.pdf_version);
    if let Some(ref p) = meta.producer {
        println!("Producer:     {}", p);
    }
    if let Some(ref c) = meta.creator {
        println!("Creator:      {}", c);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_voices(json: bool) -> Result<ExitCode> {
    if json {
        let voices: Vec<_> = Voice::ALL
            .iter()
            .map(|v| serde_json::json!({ "name": v.name(), "id": v.id(), "label": v.label() }))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&voices).context("Failed to serialise voices")?
        );
        return Ok(ExitCode::SUCCESS);
    }

    for voice in Voice::ALL {
        let marker = if voice == Voice::default() {
            cyan("*")
        } else {
            " ".to_string()
        };
        println!(
            "{} {:<8} {:<22} {}",
            marker,
            voice.name(),
            voice.id(),
            dim(voice.label())
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_glossary(cli: &Cli, args: &GlossaryArgs, show_progress: bool) -> Result<ExitCode> {
    let config = GlossaryConfig::builder()
        .title(&args.title)
        .always_include(parse_terms(&args.always_include))
        .script(&args.script)
        .python(&args.python)
        .ensure_language_model(!args.skip_model_check)
        .timeout_secs(args.timeout)
        .build()
        .context("Invalid configuration")?;

    let bar = show_progress.then(|| {
        spinner(
            "Glossary",
            "Building glossary… this can take ~15–45 seconds on first run",
        )
    });
    let result = build_glossary(&args.input, &args.output_dir, &config).await;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let output = match result {
        Ok(output) => output,
        Err(LessonKitError::GlossaryFailed { status, log }) => {
            eprintln!("{}", bold("Error log:"));
            eprintln!("{}", dim(log.trim_end()));
            return Err(LessonKitError::GlossaryFailed { status, log })
                .context("Glossary generation failed");
        }
        Err(e) => return Err(e).context("Glossary generation failed"),
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        if cli.verbose && !output.log.trim().is_empty() {
            eprintln!("{}", dim(output.log.trim_end()));
        }
        eprintln!(
            "{} Done! Your interactive glossary is ready  →  {}",
            green("✔"),
            bold(&output.path.display().to_string()),
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Map CLI args to `NarrationConfig`.
fn build_narration_config(
    args: &NarrateArgs,
    progress: Option<ProgressCallback>,
) -> Result<NarrationConfig> {
    let mut builder = NarrationConfig::builder()
        .voice(args.voice)
        .pages(args.pdf.pages.clone())
        .download_timeout_secs(args.pdf.download_timeout)
        .synthesis_timeout_secs(args.synthesis_timeout)
        .max_retries(args.max_retries);

    if let Some(ref rate) = args.rate {
        builder = builder.rate(rate);
    }
    if let Some(ref volume) = args.volume {
        builder = builder.volume(volume);
    }
    if let Some(ref pitch) = args.pitch {
        builder = builder.pitch(pitch);
    }
    if let Some(ref pwd) = args.pdf.password {
        builder = builder.password(pwd);
    }
    if let Some(ref program) = args.edge_tts {
        builder = builder.edge_tts_program(program);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `docs/lesson.pdf` or `https://x.org/lesson.pdf` → `lesson.mp3`.
fn default_audio_path(input: &str) -> PathBuf {
    let last = input
        .split(['?', '#'])
        .next()
        .unwrap_or(input)
        .rsplit('/')
        .next()
        .unwrap_or(input);
    let stem = Path::new(last)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "narration".to_string());
    PathBuf::from(format!("{stem}.mp3"))
}

/// Write to a temp file, then rename, so readers never see a partial file.
async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("txt.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
