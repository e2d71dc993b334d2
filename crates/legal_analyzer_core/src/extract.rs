//! crates/legal_analyzer_core/src/extract.rs
//!
//! Turns an uploaded file into plain text. PDFs are parsed with `lopdf`
//! page by page; plain-text files must be valid UTF-8.

use lopdf::Document;

pub const PDF_MIME: &str = "application/pdf";
pub const TEXT_MIME: &str = "text/plain";

/// The message shown to a user when a PDF yields no usable text.
pub const PDF_FAILURE_MESSAGE: &str =
    "Failed to extract text from PDF. The file might be password protected or scanned image.";

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Unsupported file format. Please upload PDF or TXT.")]
    UnsupportedFileType,
    #[error("{} (document is encrypted)", PDF_FAILURE_MESSAGE)]
    Encrypted,
    #[error("{} (no extractable text)", PDF_FAILURE_MESSAGE)]
    NoText,
    #[error("{} ({})", PDF_FAILURE_MESSAGE, .0)]
    Parse(String),
    #[error("File is not valid UTF-8 text: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// The kinds of file the analyzer accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
}

impl FileKind {
    /// Classifies by MIME type first, then by file extension.
    pub fn detect(file_name: &str, content_type: Option<&str>) -> Option<Self> {
        let mime = content_type
            .map(|ct| ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .unwrap_or_default();
        match mime.as_str() {
            PDF_MIME => return Some(FileKind::Pdf),
            TEXT_MIME => return Some(FileKind::Text),
            _ => {}
        }
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            Some(FileKind::Pdf)
        } else if lower.ends_with(".txt") {
            Some(FileKind::Text)
        } else {
            None
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            FileKind::Pdf => PDF_MIME,
            FileKind::Text => TEXT_MIME,
        }
    }
}

/// Extracts text according to the detected file kind.
pub fn extract_text(kind: FileKind, bytes: Vec<u8>) -> Result<String, ExtractError> {
    match kind {
        FileKind::Pdf => extract_pdf_text(&bytes),
        FileKind::Text => Ok(String::from_utf8(bytes)?),
    }
}

/// Extracts every page as `"\n--- Page {n} ---\n{text}"`, in page order.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let document = Document::load_mem(bytes).map_err(|e| ExtractError::Parse(e.to_string()))?;
    if document.trailer.get(b"Encrypt").is_ok() {
        return Err(ExtractError::Encrypted);
    }

    let mut full_text = String::new();
    let mut found_text = false;
    for page_number in document.get_pages().keys() {
        let page_text = document
            .extract_text(&[*page_number])
            .map_err(|e| ExtractError::Parse(e.to_string()))?;
        let page_text = page_text.split_whitespace().collect::<Vec<_>>().join(" ");
        found_text |= !page_text.is_empty();
        full_text.push_str(&format!("\n--- Page {} ---\n{}", page_number, page_text));
    }

    if !found_text {
        return Err(ExtractError::NoText);
    }
    Ok(full_text)
}
