//! End-to-end integration tests for lessonkit.
//!
//! Tests that read real PDFs from `./test_cases/` need the pdfium shared
//! library and are gated behind the `E2E_ENABLED` environment variable.
//! Everything else (text reconstruction, narration with a stand-in
//! synthesizer, the glossary wrapper driven by shell scripts) runs always.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=. cargo test --test e2e -- --nocapture

use futures::future::BoxFuture;
use lessonkit::{
    build_glossary_from_bytes, extract_text, inspect, narrate, narrate_from_bytes, narrate_pages,
    reconstruct, GlossaryConfig, LessonKitError, NarrationConfig, NarrationOutcome,
    NarrationProgressCallback, NoopProgressCallback, PageSelection, PageText, SpeechSynthesizer,
    SynthesisError, Voice,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Writes the text it receives as the "audio", so tests can read it back.
#[derive(Default)]
struct TranscriptSynthesizer {
    calls: AtomicUsize,
    voices: Mutex<Vec<Voice>>,
}

impl SpeechSynthesizer for TranscriptSynthesizer {
    fn name(&self) -> &str {
        "transcript"
    }

    fn synthesize<'a>(
        &'a self,
        text: &'a str,
        voice: Voice,
        output: &'a Path,
    ) -> BoxFuture<'a, Result<(), SynthesisError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.voices.lock().unwrap().push(voice);
            tokio::fs::write(output, text)
                .await
                .map_err(|e| SynthesisError::Io(e.to_string()))
        })
    }
}

fn transcript_config(synth: Arc<TranscriptSynthesizer>) -> NarrationConfig {
    NarrationConfig::builder()
        .synthesizer(synth)
        .retry_backoff_ms(1)
        .build()
        .unwrap()
}

fn page(n: usize, text: Option<&str>) -> PageText {
    PageText::new(n, text.map(str::to_string))
}

// ── Text reconstruction ──────────────────────────────────────────────────────

#[test]
fn test_reconstruct_examples() {
    assert_eq!(
        reconstruct(&[Some("inter-"), Some("esting test")]),
        "interesting test"
    );
    assert_eq!(reconstruct(&[Some("a   b\t\tc\n\nd")]), "a b c d");
    assert_eq!(reconstruct::<&str>(&[None, None]), "");
    assert_eq!(reconstruct(&[None, Some("hello world")]), "hello world");
    assert_eq!(
        reconstruct(&[Some("The quick\nbrown fox\njumps.")]),
        "The quick brown fox jumps."
    );
    assert_eq!(reconstruct(&[Some("page 3-"), Some(" of 10")]), "page 3 of 10");
}

#[test]
fn test_reconstruct_preserves_order_across_pages() {
    let text = reconstruct(&[Some("alpha"), None, Some("beta\ngamma"), Some("delta")]);
    let positions: Vec<usize> = ["alpha", "beta", "gamma", "delta"]
        .iter()
        .map(|w| text.find(w).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
}

#[test]
fn test_reconstruct_output_is_normalised() {
    let text = reconstruct(&[Some("  lots \r\n of\u{a0}\u{a0}space \x0c here  ")]);
    assert!(!text.starts_with(' ') && !text.ends_with(' '));
    assert!(!text.contains("  "));
    assert!(!text.contains('\n'));
    assert_eq!(reconstruct(&[Some(text.as_str())]), text);
}

// ── Configuration ────────────────────────────────────────────────────────────

#[test]
fn test_page_selection_out_of_range_is_empty() {
    assert!(PageSelection::Single(9).to_indices(3).is_empty());
    assert!(PageSelection::Range(5, 8).to_indices(3).is_empty());
}

#[test]
fn test_page_selection_range_clipping() {
    assert_eq!(PageSelection::Range(2, 99).to_indices(4), vec![1, 2, 3]);
}

#[test]
fn test_every_voice_round_trips_through_its_name() {
    for voice in Voice::ALL {
        assert_eq!(voice.name().parse::<Voice>().unwrap(), voice);
        assert_eq!(voice.id().parse::<Voice>().unwrap(), voice);
    }
}

#[test]
fn test_noop_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NoopProgressCallback>();
    assert_send_sync::<NarrationConfig>();
}

// ── Narration with a stand-in synthesizer ────────────────────────────────────

#[tokio::test]
async fn test_narrate_pages_speaks_reconstructed_text() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested/lesson.mp3");
    let synth = Arc::new(TranscriptSynthesizer::default());
    let mut config = transcript_config(synth.clone());
    config.voice = Voice::Natasha;

    let pages = vec![
        page(1, Some("Chapter 1\r\nThe water cy-\r\ncle moves")),
        page(2, None),
        page(3, Some("water   through\tthe\n\natmosphere.")),
    ];
    let outcome = narrate_pages(&pages, &out, &config).await;

    let output = outcome.output().expect("narration should succeed");
    assert_eq!(output.audio_path, out);
    assert_eq!(output.voice, Voice::Natasha);
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "Chapter 1 The water cycle moves water through the atmosphere."
    );
    assert_eq!(synth.voices.lock().unwrap().as_slice(), [Voice::Natasha]);
}

#[tokio::test]
async fn test_unreadable_document_skips_synthesis() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("lesson.mp3");
    let synth = Arc::new(TranscriptSynthesizer::default());
    let config = transcript_config(synth.clone());

    let outcome = narrate_pages(&[page(1, None), page(2, Some("\n \n"))], &out, &config).await;

    assert!(matches!(outcome, NarrationOutcome::NoReadableText { pages: 2 }));
    assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
    assert!(!out.exists());
}

#[tokio::test]
async fn test_outcome_is_json_serialisable() {
    let dir = tempfile::tempdir().unwrap();
    let config = transcript_config(Arc::new(TranscriptSynthesizer::default()));
    let outcome = narrate_pages(&[page(1, Some("hi"))], dir.path().join("a.mp3"), &config).await;

    let json = serde_json::to_string(&outcome).unwrap();
    assert!(json.contains("\"Narrated\""), "{json}");
    assert!(json.contains("\"Aria\""), "{json}");
}

#[tokio::test]
async fn test_callback_send_in_tokio_spawn() {
    struct Counter(AtomicUsize);
    impl NarrationProgressCallback for Counter {
        fn on_page_extracted(&self, _page: usize, _total: usize, _chars: usize) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let counter = Arc::new(Counter(AtomicUsize::new(0)));
    let config = NarrationConfig::builder()
        .synthesizer(Arc::new(TranscriptSynthesizer::default()))
        .progress_callback(counter.clone())
        .build()
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("spawned.mp3");
    let handle = tokio::spawn(async move {
        narrate_pages(&[page(1, Some("a")), page(2, Some("b"))], &out, &config).await
    });
    assert!(handle.await.unwrap().is_success());
    assert_eq!(counter.0.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_narrate_from_bytes_rejects_non_pdf() {
    let synth = Arc::new(TranscriptSynthesizer::default());
    let config = transcript_config(synth.clone());
    let dir = tempfile::tempdir().unwrap();

    let err = narrate_from_bytes(b"PK\x03\x04 not a pdf", dir.path().join("x.mp3"), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, LessonKitError::NotAPdf { .. }), "{err}");
    assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_narrate_sync_reports_missing_file() {
    let config = transcript_config(Arc::new(TranscriptSynthesizer::default()));
    let err = lessonkit::narrate_sync("/no/such/lesson.pdf", "out.mp3", &config).unwrap_err();
    assert!(matches!(err, LessonKitError::FileNotFound { .. }));
}

#[test]
fn test_inspect_missing_file_without_runtime() {
    let err = tokio_test::block_on(inspect("/no/such/lesson.pdf")).unwrap_err();
    assert!(matches!(err, LessonKitError::FileNotFound { .. }));
}

#[test]
fn test_extract_rejects_blank_input() {
    let result = tokio_test::block_on(extract_text("   ", &NarrationConfig::default()));
    tokio_test::assert_err!(&result);
    assert!(matches!(result, Err(LessonKitError::InvalidInput { .. })));
}

// ── External programs (shell-script stand-ins) ───────────────────────────────

#[cfg(unix)]
fn executable(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
#[tokio::test]
async fn test_edge_tts_program_receives_voice_and_text() {
    let dir = tempfile::tempdir().unwrap();
    // $2 = voice id, $4 = text file, $6 = media path
    let program = executable(
        dir.path(),
        "edge-tts",
        r#"{ echo "$2"; cat "$4"; } > "$6""#,
    );
    let config = NarrationConfig::builder()
        .voice(Voice::Ryan)
        .edge_tts_program(program)
        .synthesis_timeout_secs(10)
        .build()
        .unwrap();

    let out = dir.path().join("lesson.mp3");
    let outcome = narrate_pages(&[page(1, Some("Good morning,\nclass."))], &out, &config).await;

    assert!(outcome.is_success(), "{}", outcome.user_message());
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "en-GB-RyanNeural\nGood morning, class."
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_edge_tts_failure_is_retried_then_reported() {
    let dir = tempfile::tempdir().unwrap();
    let counter = dir.path().join("count");
    let program = executable(
        dir.path(),
        "edge-tts",
        &format!(
            "echo x >> '{}'; echo 'WebSocket closed' >&2; exit 1",
            counter.display()
        ),
    );
    let config = NarrationConfig::builder()
        .edge_tts_program(program)
        .max_retries(2)
        .retry_backoff_ms(1)
        .build()
        .unwrap();

    let out = dir.path().join("lesson.mp3");
    match narrate_pages(&[page(1, Some("hello"))], &out, &config).await {
        NarrationOutcome::SynthesisFailed { attempts, error } => {
            assert_eq!(attempts, 3);
            assert!(error.to_string().contains("WebSocket closed"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(std::fs::read_to_string(&counter).unwrap().lines().count(), 3);
    assert!(!out.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_glossary_from_upload() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("builder.sh");
    std::fs::write(&script, r#"printf '%s|%s' "$6" "$8" > "$4""#).unwrap();
    let config = GlossaryConfig::builder()
        .title("Rivers")
        .always_include(lessonkit::parse_terms("delta, estuary"))
        .script(&script)
        .python("sh")
        .ensure_language_model(false)
        .build()
        .unwrap();

    let out_dir = dir.path().join("out");
    let output = build_glossary_from_bytes("unit 4.docx", b"PK", &out_dir, &config)
        .await
        .unwrap();
    assert_eq!(output.file_name, "unit 4_glossary.docx");
    assert_eq!(
        std::fs::read_to_string(out_dir.join("unit 4_glossary.docx")).unwrap(),
        "Rivers|delta,estuary"
    );
}

#[tokio::test]
async fn test_glossary_rejects_pdf_upload() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("builder.py");
    std::fs::write(&script, "").unwrap();
    let config = GlossaryConfig::builder()
        .script(&script)
        .ensure_language_model(false)
        .build()
        .unwrap();

    let err = build_glossary_from_bytes("lesson.pdf", b"%PDF", dir.path(), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, LessonKitError::UnsupportedDocument { .. }));
}

// ── Real PDFs (pdfium) ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_inspect_lesson() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("lesson.pdf"));

    let meta = inspect(path.to_str().unwrap())
        .await
        .expect("inspect() should succeed");
    assert!(meta.page_count > 0);
    assert!(!meta.pdf_version.is_empty());
    println!("Metadata: {:?}", meta);
}

#[tokio::test]
async fn test_extract_lesson_text() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("lesson.pdf"));

    let extracted = extract_text(path.to_str().unwrap(), &NarrationConfig::default())
        .await
        .expect("extract_text() should succeed");
    assert!(!extracted.is_empty());
    assert!(!extracted.text.contains('\n'));
    assert!(!extracted.text.contains("  "));
    assert_eq!(extracted.stats.selected_pages, extracted.metadata.page_count);
    println!(
        "{} chars from {} pages",
        extracted.stats.cleaned_chars, extracted.stats.pages_with_text
    );
}

#[tokio::test]
async fn test_extract_page_out_of_range() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("lesson.pdf"));

    let config = NarrationConfig::builder()
        .pages(PageSelection::Single(10_000))
        .build()
        .unwrap();
    let err = extract_text(path.to_str().unwrap(), &config)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LessonKitError::PageOutOfRange { page: 10_000, .. }
    ));
}

#[tokio::test]
async fn test_scanned_pdf_has_no_readable_text() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("scanned.pdf"));

    let synth = Arc::new(TranscriptSynthesizer::default());
    let config = transcript_config(synth.clone());
    let dir = tempfile::tempdir().unwrap();
    let outcome = narrate(path.to_str().unwrap(), dir.path().join("s.mp3"), &config)
        .await
        .expect("narrate() should succeed");

    assert!(matches!(outcome, NarrationOutcome::NoReadableText { .. }));
    assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_narrate_lesson_with_transcript() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("lesson.pdf"));

    let synth = Arc::new(TranscriptSynthesizer::default());
    let config = transcript_config(synth);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("lesson.mp3");
    let outcome = narrate(path.to_str().unwrap(), &out, &config)
        .await
        .expect("narrate() should succeed");

    let output = outcome.output().expect("narrated");
    let spoken = std::fs::read_to_string(&out).unwrap();
    assert_eq!(spoken.chars().count(), output.text_chars);
    assert!(output.extraction.is_some());
}
