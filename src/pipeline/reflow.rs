//! Text-flow reconstruction: turn page-broken PDF text into one speakable string.
//!
//! PDF text extraction hands back one block per page, hard-wrapped at the
//! physical line ends of the layout and with words split across lines by a
//! trailing hyphen. Read aloud as-is, every line break becomes a pause and
//! every split word is spoken as two fragments. [`reconstruct`] undoes that.
//!
//! ## Stage Order
//!
//! ```text
//! pages ──▶ split_lines ──▶ flatten_lines ──▶ repair_hyphenation ──▶ normalise_whitespace
//!           (per page)      (join with ' ')   (delete "- ")          (collapse + trim)
//! ```
//!
//! Hyphenation repair must run before whitespace normalisation. A hyphen
//! followed by two spaces loses only the first space, and normalisation
//! afterwards never recreates a `"- "` that repair could have seen.
//!
//! The repair is unconditional: every `"- "` is deleted, including ones that
//! were never line-wrap artefacts (`"page 3- of 10"`, a dash rendered as a
//! hyphen).

use crate::output::PageText;
use once_cell::sync::Lazy;
use regex::Regex;

/// Reconstruct a single speakable string from per-page extracted text.
///
/// `pages` holds one element per page in document order; `None` marks a page
/// with no extractable text. Pure and total: the same input always yields the
/// same output and no input makes it fail. An empty result means the document
/// had no readable text.
///
/// ```rust
/// use lessonkit::pipeline::reflow::reconstruct;
///
/// let pages = [Some("The quick\nbrown fox\njumps."), None];
/// assert_eq!(reconstruct(&pages), "The quick brown fox jumps.");
/// ```
pub fn reconstruct<S: AsRef<str>>(pages: &[Option<S>]) -> String {
    let lines = pages
        .iter()
        .flatten()
        .flat_map(|page| split_lines(page.as_ref()));
    let flattened = flatten_lines(lines);
    let repaired = repair_hyphenation(&flattened);
    normalise_whitespace(&repaired)
}

/// [`reconstruct`] over extractor output.
pub fn reconstruct_pages(pages: &[PageText]) -> String {
    let texts: Vec<Option<&str>> = pages.iter().map(|p| p.text.as_deref()).collect();
    reconstruct(&texts)
}

// ── Stage 1: Line splitting ──────────────────────────────────────────────────

/// Characters treated as a line boundary. `\r\n` counts as one boundary.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r'
            | '\u{0B}'
            | '\u{0C}'
            | '\u{1C}'
            | '\u{1D}'
            | '\u{1E}'
            | '\u{85}'
            | '\u{2028}'
            | '\u{2029}'
    )
}

/// Split one page's text into its physical lines.
///
/// A trailing line break does not produce a trailing empty line and the
/// empty string yields no lines at all. Whitespace-only text is kept as a
/// line: it is text, not absence.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&text[start..idx]);
        let mut end = idx + c.len_utf8();
        if c == '\r' {
            if let Some(&(next_idx, '\n')) = chars.peek() {
                chars.next();
                end = next_idx + 1;
            }
        }
        start = end;
    }

    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

// ── Stage 2: Line flattening ─────────────────────────────────────────────────

/// Join lines in order with a single ASCII space between neighbours.
pub fn flatten_lines<'a, I>(lines: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for (i, line) in lines.into_iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(line);
    }
    out
}

// ── Stage 3: Hyphenation repair ──────────────────────────────────────────────

/// Delete every literal `"- "`, left to right, without overlap.
pub fn repair_hyphenation(text: &str) -> String {
    text.replace("- ", "")
}

// ── Stage 4: Whitespace normalisation ────────────────────────────────────────

// Unicode `\s` leaves out the information separators `\x1c`-`\x1f`.
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\x1c-\x1f]+").unwrap());

/// Collapse every whitespace run to one space and trim both ends.
///
/// The ASCII separators `\x1c`-`\x1f` count as whitespace.
pub fn normalise_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text, " ").trim().to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────
