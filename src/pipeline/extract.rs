//! Page text acquisition: read the text layer of selected pages via pdfium.
//!
//! pdfium is a C++ library with thread-local state, so every call runs
//! inside `tokio::task::spawn_blocking`. Each page yields `Some(text)` or,
//! when the page has no text layer (scanned image) or its text layer is
//! unreadable, `None`. A broken page never aborts the document.

use crate::config::PageSelection;
use crate::error::LessonKitError;
use crate::output::{DocumentMetadata, PageText};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming a pdfium library file or the directory holding it.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Text of the selected pages plus the document page count.
#[derive(Debug, Clone)]
pub struct ExtractedPages {
    pub total_pages: usize,
    pub pages: Vec<PageText>,
}

/// Extract the raw text of the selected pages, in page order.
///
/// # Errors
/// Fatal only: pdfium cannot be bound, the document cannot be opened, or the
/// selection matches no page.
pub async fn extract_page_texts(
    pdf_path: &Path,
    password: Option<&str>,
    selection: &PageSelection,
) -> Result<ExtractedPages, LessonKitError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(str::to_string);
    let selection = selection.clone();

    tokio::task::spawn_blocking(move || {
        extract_page_texts_blocking(&path, pwd.as_deref(), &selection)
    })
    .await
    .map_err(|e| LessonKitError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Blocking implementation of text extraction.
fn extract_page_texts_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    selection: &PageSelection,
) -> Result<ExtractedPages, LessonKitError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let indices = selection.to_indices(total_pages);
    if indices.is_empty() {
        return Err(LessonKitError::PageOutOfRange {
            page: first_requested_page(selection),
            total: total_pages,
        });
    }

    let mut results = Vec::with_capacity(indices.len());
    for idx in indices {
        let page_num = idx + 1;
        let text = match page_index(idx) {
            None => {
                warn!("Page {}: index beyond pdfium's page range", page_num);
                None
            }
            Some(index) => match pages.get(index) {
                Ok(page) => match page.text() {
                    Ok(text) => non_empty(text.all()),
                    Err(e) => {
                        warn!("Page {}: text layer unreadable: {:?}", page_num, e);
                        None
                    }
                },
                Err(e) => {
                    warn!("Page {}: could not be loaded: {:?}", page_num, e);
                    None
                }
            },
        };

        match &text {
            Some(t) => debug!("Page {} → {} chars", page_num, t.chars().count()),
            None => debug!("Page {} → no text", page_num),
        }
        results.push(PageText::new(page_num, text));
    }

    Ok(ExtractedPages {
        total_pages,
        pages: results,
    })
}

/// The extractor reports "no text" as an empty string; treat that as absent.
fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn first_requested_page(selection: &PageSelection) -> usize {
    match selection {
        PageSelection::All => 0,
        PageSelection::Single(p) => *p,
        PageSelection::Range(start, _) => *start,
        PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(0),
    }
}

/// Extract document metadata without reading page text.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, LessonKitError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(str::to_string);

    tokio::task::spawn_blocking(move || extract_metadata_blocking(&path, pwd.as_deref()))
        .await
        .map_err(|e| LessonKitError::Internal(format!("Metadata task panicked: {}", e)))?
}

/// Blocking implementation of metadata extraction.
fn extract_metadata_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, LessonKitError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;

    let metadata = document.metadata();
    let pages = document.pages();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count: pages.len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}

/// Open a document, mapping pdfium's load errors onto password/corruption errors.
/// pdfium addresses pages with `u16`.
fn page_index(idx: usize) -> Option<u16> {
    u16::try_from(idx).ok()
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, LessonKitError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                LessonKitError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                LessonKitError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            LessonKitError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Bind pdfium: `PDFIUM_LIB_PATH`, then the working directory, then the system library.
pub fn bind_pdfium() -> Result<Pdfium, LessonKitError> {
    if let Some(path) = std::env::var_os(PDFIUM_LIB_PATH_ENV) {
        let path = library_path(PathBuf::from(path));
        debug!("Binding pdfium from {}", path.display());
        return Pdfium::bind_to_library(&path)
            .map(Pdfium::new)
            .map_err(|e| {
                LessonKitError::PdfiumBindingFailed(format!("{}: {:?}", path.display(), e))
            });
    }

    match Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")) {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(primary_err) => match Pdfium::bind_to_system_library() {
            Ok(bindings) => Ok(Pdfium::new(bindings)),
            Err(_) => Err(LessonKitError::PdfiumBindingFailed(format!(
                "{:?}",
                primary_err
            ))),
        },
    }
}

/// A directory resolves to the platform library name inside it.
fn library_path(path: PathBuf) -> PathBuf {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(&path)
    } else {
        path
    }
}
