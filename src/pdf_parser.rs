use anyhow::{Context, Result};
use lopdf::Document;

/// Returns the text of a pdf, one page after the other separated by a newline
///
/// The line break lopdf ends every page's text with is dropped so that pages "A"
/// and "B" come out as "A\nB". Anything else is kept as extracted.
///
/// # Arguments
///
/// * 'bytes' - the pdf file content
pub fn pdf_text(bytes: &[u8]) -> Result<String> {
    let doc = Document::load_mem(bytes).context("failed to load pdf")?;

    let mut pages: Vec<String> = Vec::new();
    for page_number in doc.get_pages().keys() {
        let text = doc
            .extract_text(&[*page_number])
            .with_context(|| format!("failed to extract text from page {}", page_number))?;
        pages.push(text.strip_suffix('\n').unwrap_or(&text).to_string());
    }

    Ok(pages.join("\n"))
}
