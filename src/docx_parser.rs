use std::io::{Cursor, Read};
use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";

/// Returns the text of a word processing document, one paragraph per line
///
/// # Arguments
///
/// * 'bytes' - the docx file content
pub fn docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).context("failed to open docx package")?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .with_context(|| format!("docx package has no {}", DOCUMENT_PART))?
        .read_to_string(&mut xml)
        .context("failed to read document part")?;

    Ok(paragraphs(&xml)?.join("\n"))
}

/// Collects the text of every `w:p` element in document order
///
/// Runs are concatenated, `w:tab` becomes a tab and `w:br`/`w:cr` a line break.
/// Paragraphs nested in text boxes are emitted before their enclosing paragraph.
///
/// # Arguments
///
/// * 'xml' - content of word/document.xml
fn paragraphs(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut open: Vec<String> = Vec::new();
    let mut done: Vec<String> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event().context("malformed document xml")? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => open.push(String::new()),
                b"w:t" => in_text = true,
                _ => (),
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => done.push(String::new()),
                b"w:tab" => push_str(&mut open, "\t"),
                b"w:br" | b"w:cr" => push_str(&mut open, "\n"),
                _ => (),
            },
            Event::Text(t) if in_text => push_str(&mut open, &t.unescape()?),
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    if let Some(p) = open.pop() {
                        done.push(p);
                    }
                }
                _ => (),
            },
            Event::Eof => break,
            _ => (),
        }
    }

    Ok(done)
}

fn push_str(open: &mut [String], s: &str) {
    if let Some(p) = open.last_mut() {
        p.push_str(s);
    }
}
