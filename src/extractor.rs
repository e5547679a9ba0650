use log::{info, warn};
use crate::docx_parser::docx_text;
use crate::errors::ExtractionError;
use crate::pdf_parser::pdf_text;

const PDF_MIME: &str = "application/pdf";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const DOCX_SUFFIX: &str = ".docx";

/// The document formats text can be extracted from
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExtractorKind {
    Pdf,
    Docx,
}

/// Picks an extractor from the declared content type, falling back to the file
/// name or id suffix for word processing documents
///
/// # Arguments
///
/// * 'content_type' - declared content type, parameters such as charset are ignored
/// * 'file_hint' - file name or id
pub fn classify(content_type: &str, file_hint: &str) -> Option<ExtractorKind> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence == PDF_MIME {
        Some(ExtractorKind::Pdf)
    } else if essence == DOCX_MIME
        || essence.contains("wordprocessingml")
        || file_hint.to_ascii_lowercase().ends_with(DOCX_SUFFIX)
    {
        Some(ExtractorKind::Docx)
    } else {
        None
    }
}

/// Extracts text from downloaded bytes
///
/// Unknown content types fail with `ExtractionError::Unsupported` without touching
/// the bytes; parser failures become `ExtractionError::Failed`.
///
/// # Arguments
///
/// * 'bytes' - file content
/// * 'content_type' - declared content type
/// * 'file_hint' - file name or id
pub fn extract(bytes: &[u8], content_type: &str, file_hint: &str) -> Result<String, ExtractionError> {
    let kind = classify(content_type, file_hint)
        .ok_or_else(|| ExtractionError::Unsupported(content_type.to_string()))?;
    info!("extracting {:?} text from {} ({} bytes)", kind, file_hint, bytes.len());

    let result = match kind {
        ExtractorKind::Pdf => pdf_text(bytes),
        ExtractorKind::Docx => docx_text(bytes),
    };

    result.map_err(|e| {
        warn!("{:?} extraction failed for {}: {:#}", kind, file_hint, e);
        ExtractionError::Failed(format!("{:#}", e))
    })
}

/// Runs `extract` on the blocking thread pool
///
/// # Arguments
///
/// * 'bytes' - file content
/// * 'content_type' - declared content type
/// * 'file_hint' - file name or id
pub async fn extract_blocking(bytes: Vec<u8>, content_type: String, file_hint: String) -> Result<String, ExtractionError> {
    tokio::task::spawn_blocking(move || extract(&bytes, &content_type, &file_hint))
        .await
        .map_err(|e| ExtractionError::Failed(e.to_string()))?
}
