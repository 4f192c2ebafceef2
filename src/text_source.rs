// src/text_source.rs

use std::sync::Arc;

use lopdf::Document;
use tracing::{info, warn};

use crate::error::ExtractError;

/// Result of attempting to extract text from a PDF.
#[derive(Debug)]
pub enum PdfContent {
    /// The PDF contains extractable text.
    Text(String),
    /// The PDF appears to be scanned / image-only — needs OCR.
    ScannedImage,
    /// Something went wrong during extraction.
    Error(String),
}

/// Minimum number of non-whitespace characters we expect from a
/// "real" text PDF. Below this threshold we treat it as scanned.
const MIN_TEXT_CHARS: usize = 30;

/// Turns document bytes into plain text. Empty text is a valid answer.
pub trait TextSource: Send + Sync {
    fn text(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Recognises text in a scanned document.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// No OCR available: scanned documents yield no text, so every field
/// reports not-found.
pub struct NoOcr;

impl OcrEngine for NoOcr {
    fn recognize(&self, _bytes: &[u8]) -> Result<String, ExtractError> {
        warn!("No OCR engine configured — scanned document yields empty text");
        Ok(String::new())
    }
}

/// Direct PDF text extraction, falling back to OCR for scanned documents.
pub struct PdfTextSource {
    ocr: Arc<dyn OcrEngine>,
}

impl PdfTextSource {
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self { ocr }
    }
}

impl Default for PdfTextSource {
    fn default() -> Self {
        Self::new(Arc::new(NoOcr))
    }
}

impl TextSource for PdfTextSource {
    fn text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        match extract_text_from_pdf(bytes) {
            PdfContent::Text(text) => Ok(text),
            PdfContent::ScannedImage => {
                info!("PDF is scanned — handing over to OCR");
                self.ocr.recognize(bytes)
            }
            PdfContent::Error(e) => Err(ExtractError::Source(e)),
        }
    }
}

/// Main entry point: takes raw PDF bytes and returns `PdfContent`.
pub fn extract_text_from_pdf(pdf_bytes: &[u8]) -> PdfContent {
    // --- Phase 1: structural check with lopdf ---
    let doc = match Document::load_mem(pdf_bytes) {
        Ok(d) => d,
        Err(e) => return PdfContent::Error(format!("Failed to parse PDF: {e}")),
    };

    if looks_like_scanned(&doc) {
        info!("PDF structural check: likely scanned / image-only");
        return PdfContent::ScannedImage;
    }

    // --- Phase 2: attempt full text extraction ---
    match pdf_extract::extract_text_from_mem(pdf_bytes) {
        Ok(text) => {
            let meaningful = text.chars().filter(|c| !c.is_whitespace()).count();
            if meaningful < MIN_TEXT_CHARS {
                info!(
                    chars = meaningful,
                    "Extracted text too short — treating as scanned"
                );
                PdfContent::ScannedImage
            } else {
                info!(chars = meaningful, "Text extracted successfully");
                PdfContent::Text(text)
            }
        }
        Err(e) => {
            warn!(error = %e, "pdf-extract failed — may be scanned or corrupted");
            PdfContent::ScannedImage
        }
    }
}

/// Heuristic: inspect the PDF object tree for signs that every page
/// is just a single image with no text operators.
///
/// A page with XObject images but **no** Font resources is almost
/// certainly a scanned page.
fn looks_like_scanned(doc: &Document) -> bool {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return false; // Can't tell — let text extraction try
    }

    let mut image_only_pages = 0;

    for object_id in pages.values() {
        let Ok(page_dict) = doc.get_object(*object_id).and_then(|o| o.as_dict()) else {
            continue;
        };

        let resources = page_dict
            .get(b"Resources")
            .ok()
            .and_then(|r| doc.dereference(r).ok())
            .and_then(|(_, resolved)| resolved.as_dict().ok());

        let has_entries = |key: &[u8]| {
            resources
                .and_then(|res| res.get(key).ok())
                .and_then(|o| doc.dereference(o).ok())
                .and_then(|(_, resolved)| resolved.as_dict().ok())
                .is_some_and(|d| !d.is_empty())
        };

        if has_entries(b"XObject") && !has_entries(b"Font") {
            image_only_pages += 1;
        }
    }

    let total = pages.len();
    let ratio = image_only_pages as f64 / total as f64;
    info!(
        total_pages = total,
        image_only = image_only_pages,
        ratio = format!("{ratio:.2}"),
        "Scanned-page analysis"
    );

    // If ≥80% of pages are image-only, treat the whole PDF as scanned
    ratio >= 0.8
}
