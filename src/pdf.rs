//! PDF renderer adapter for the analyze task — wraps a block of plain-text analysis in
//! a single-font paginated PDF. Rendering failure is absorbed by the caller (§4.2): a
//! failure here never fails the owning job.

use std::io::BufWriter;

use printpdf::{BuiltinFont, Mm, PdfDocument};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("pdf generation failed: {0}")]
    Generation(String),
}

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const FONT_SIZE: f32 = 11.0;
const LINE_HEIGHT_MM: f32 = 6.0;
const CHARS_PER_LINE: usize = 95;

/// Renders `title` and `body` into a multi-page PDF, wrapping lines to fit the page
/// width and starting a new page whenever the current one fills up.
pub fn render_text_report(title: &str, body: &str) -> Result<Vec<u8>, PdfError> {
    let (doc, page1, layer1) = PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| PdfError::Generation(e.to_string()))?;

    let lines = wrap_lines(body, CHARS_PER_LINE);
    let usable_height = PAGE_HEIGHT_MM - 2.0 * MARGIN_MM;
    let lines_per_page = (usable_height / LINE_HEIGHT_MM).floor() as usize;

    let mut current_layer = doc.get_page(page1).get_layer(layer1);
    let mut cursor_y = PAGE_HEIGHT_MM - MARGIN_MM;
    let mut printed_on_page = 0usize;

    current_layer.use_text(title, FONT_SIZE + 2.0, Mm(MARGIN_MM), Mm(cursor_y), &font);
    cursor_y -= LINE_HEIGHT_MM * 2.0;

    for line in lines {
        if printed_on_page >= lines_per_page {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            current_layer = doc.get_page(page).get_layer(layer);
            cursor_y = PAGE_HEIGHT_MM - MARGIN_MM;
            printed_on_page = 0;
        }
        current_layer.use_text(&line, FONT_SIZE, Mm(MARGIN_MM), Mm(cursor_y), &font);
        cursor_y -= LINE_HEIGHT_MM;
        printed_on_page += 1;
    }

    let mut buffer = BufWriter::new(Vec::new());
    doc.save(&mut buffer).map_err(|e| PdfError::Generation(e.to_string()))?;
    buffer.into_inner().map_err(|e| PdfError::Generation(e.to_string()))
}

fn wrap_lines(body: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    for paragraph in body.split('\n') {
        if paragraph.is_empty() {
            out.push(String::new());
            continue;
        }
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.len() + word.len() + 1 > width && !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            out.push(current);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_lines_respects_width() {
        let body = "a ".repeat(200);
        let lines = wrap_lines(&body, 20);
        assert!(lines.iter().all(|l| l.len() <= 20));
    }

    #[test]
    fn wrap_lines_preserves_paragraph_breaks() {
        let lines = wrap_lines("first paragraph\n\nsecond paragraph", 100);
        assert_eq!(lines, vec!["first paragraph".to_string(), String::new(), "second paragraph".to_string()]);
    }

    #[test]
    fn render_produces_non_empty_pdf_bytes() {
        let bytes = render_text_report("Weekly Analysis", "CTR dropped across three campaigns.").unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(&bytes[0..4], b"%PDF");
    }
}
