//! Minimal PDF 1.4 writer for report layouts.
//!
//! Uses the standard Type 1 fonts (no embedding) with WinAnsi encoding, so
//! text outside Windows-1252 is replaced with `?`. Output is deterministic for a
//! given layout and creation date.

use std::io::Write;

use chrono::{DateTime, Utc};

use super::layout::{ReportLayout, DETAIL_HEADER, SUMMARY_HEADER};
use crate::codepage;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;

const TITLE_SIZE: f32 = 18.0;
const HEADING_SIZE: f32 = 13.0;
const BODY_SIZE: f32 = 10.0;
const ROW_HEIGHT: f32 = 18.0;
const CELL_PAD: f32 = 4.0;

const SUMMARY_WIDTHS: [f32; 2] = [250.0, 245.0];
const DETAIL_WIDTHS: [f32; 4] = [100.0, 195.0, 120.0, 80.0];

/// First object number used by pages; 1-4 are catalog, page tree and fonts.
const FIRST_PAGE_OBJ: usize = 5;

#[derive(Debug, Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Encode text as a PDF literal string body.
fn escape_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            ' '..='~' => out.push(c as u8),
            '\t' | '\n' | '\r' => out.push(b' '),
            _ => match codepage::encode_char(c) {
                // Octal escape keeps the file 7-bit clean.
                Some(byte) if byte >= 0x80 => {
                    let _ = write!(out, "\\{byte:03o}");
                }
                _ => out.push(b'?'),
            },
        }
    }
    out
}

/// Cut `text` so it fits `width` points, using an average glyph width.
fn fit_text(text: &str, width: f32, size: f32) -> String {
    let max_chars = ((width - 2.0 * CELL_PAD) / (size * 0.5)).floor().max(1.0) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str("...");
    cut
}

/// Content stream of one page under construction.
struct Page {
    content: Vec<u8>,
}

impl Page {
    fn new() -> Self {
        Self {
            content: Vec::new(),
        }
    }

    fn text(&mut self, font: Font, size: f32, x: f32, y: f32, text: &str) {
        let _ = write!(
            self.content,
            "BT /{} {} Tf {:.2} {:.2} Td (",
            font.resource(),
            size,
            x,
            y
        );
        self.content.extend_from_slice(&escape_text(text));
        self.content.extend_from_slice(b") Tj ET\n");
    }

    fn rule(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let _ = writeln!(
            self.content,
            "0.5 w {x1:.2} {y1:.2} m {x2:.2} {y2:.2} l S"
        );
    }

    fn shade(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let _ = writeln!(self.content, "0.9 g {x:.2} {y:.2} {w:.2} {h:.2} re f 0 g");
    }
}

/// Lays text onto pages top to bottom, starting new pages as needed.
struct Typesetter {
    pages: Vec<Page>,
    y: f32,
}

impl Typesetter {
    fn new() -> Self {
        Self {
            pages: vec![Page::new()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn page(&mut self) -> &mut Page {
        // `pages` is never empty.
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn fits(&self, height: f32) -> bool {
        self.y - height >= MARGIN
    }

    fn new_page(&mut self) {
        self.pages.push(Page::new());
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn line(&mut self, font: Font, size: f32, text: &str) {
        let height = size * 1.4;
        if !self.fits(height) {
            self.new_page();
        }
        self.y -= height;
        let y = self.y;
        let text = fit_text(text, PAGE_WIDTH - 2.0 * MARGIN, size);
        self.page().text(font, size, MARGIN, y, &text);
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn row<S: AsRef<str>>(&mut self, cells: &[S], widths: &[f32], header: bool) {
        self.y -= ROW_HEIGHT;
        let y = self.y;
        let total: f32 = widths.iter().sum();
        let page = self.page();
        if header {
            page.shade(MARGIN, y, total, ROW_HEIGHT);
        }
        let font = if header { Font::Bold } else { Font::Regular };
        let mut x = MARGIN;
        for (cell, width) in cells.iter().zip(widths) {
            let text = fit_text(cell.as_ref(), *width, BODY_SIZE);
            page.text(font, BODY_SIZE, x + CELL_PAD, y + 5.0, &text);
            x += width;
        }
        page.rule(MARGIN, y, MARGIN + total, y);
    }

    /// A table whose header row repeats at the top of every page it spans.
    fn table<S: AsRef<str>>(&mut self, header: &[&str], rows: &[Vec<S>], widths: &[f32]) {
        if !self.fits(2.0 * ROW_HEIGHT) {
            self.new_page();
        }
        self.row(header, widths, true);
        for row in rows {
            if !self.fits(ROW_HEIGHT) {
                self.new_page();
                self.row(header, widths, true);
            }
            self.row(row, widths, false);
        }
    }

    fn finish(self) -> Vec<Page> {
        self.pages
    }
}

fn typeset(layout: &ReportLayout) -> Vec<Page> {
    let mut ts = Typesetter::new();

    ts.line(Font::Bold, TITLE_SIZE, &layout.title);
    ts.line(Font::Regular, BODY_SIZE, &layout.date_line);
    ts.gap(12.0);

    ts.line(Font::Bold, HEADING_SIZE, "Summary");
    ts.gap(4.0);
    let summary: Vec<Vec<&str>> = layout
        .summary
        .iter()
        .map(|r| r.iter().map(String::as_str).collect())
        .collect();
    ts.table(&SUMMARY_HEADER, &summary, &SUMMARY_WIDTHS);
    ts.gap(16.0);

    ts.line(Font::Bold, HEADING_SIZE, "Equipment Details");
    if layout.omitted_rows > 0 {
        let shown = layout.detail.len();
        ts.line(
            Font::Regular,
            BODY_SIZE,
            &format!(
                "Showing the first {shown} of {} rows.",
                shown + layout.omitted_rows
            ),
        );
    }
    ts.gap(4.0);
    let detail: Vec<Vec<&str>> = layout
        .detail
        .iter()
        .map(|r| r.iter().map(String::as_str).collect())
        .collect();
    ts.table(&DETAIL_HEADER, &detail, &DETAIL_WIDTHS);

    ts.finish()
}

fn begin_object(out: &mut Vec<u8>, offsets: &mut Vec<usize>, num: usize) {
    offsets.push(out.len());
    let _ = writeln!(out, "{num} 0 obj");
}

/// Serialize `layout` as a complete PDF file.
pub fn write_pdf(layout: &ReportLayout, created: DateTime<Utc>) -> Vec<u8> {
    let pages = typeset(layout);
    let page_count = pages.len();
    let info_obj = FIRST_PAGE_OBJ + 2 * page_count;
    let object_count = info_obj;

    let mut out: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = Vec::with_capacity(object_count);

    out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

    begin_object(&mut out, &mut offsets, 1);
    out.extend_from_slice(b"<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

    begin_object(&mut out, &mut offsets, 2);
    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", FIRST_PAGE_OBJ + 2 * i))
        .collect();
    let _ = write!(
        out,
        "<< /Type /Pages /Kids [{}] /Count {page_count} >>\nendobj\n",
        kids.join(" ")
    );

    for (num, base) in [(3, "Helvetica"), (4, "Helvetica-Bold")] {
        begin_object(&mut out, &mut offsets, num);
        let _ = write!(
            out,
            "<< /Type /Font /Subtype /Type1 /BaseFont /{base} /Encoding /WinAnsiEncoding >>\nendobj\n"
        );
    }

    for (i, page) in pages.iter().enumerate() {
        let page_obj = FIRST_PAGE_OBJ + 2 * i;
        begin_object(&mut out, &mut offsets, page_obj);
        let _ = write!(
            out,
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
             /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>\nendobj\n",
            page_obj + 1
        );

        begin_object(&mut out, &mut offsets, page_obj + 1);
        let _ = write!(out, "<< /Length {} >>\nstream\n", page.content.len());
        out.extend_from_slice(&page.content);
        out.extend_from_slice(b"\nendstream\nendobj\n");
    }

    begin_object(&mut out, &mut offsets, info_obj);
    out.extend_from_slice(b"<< /Title (");
    out.extend_from_slice(&escape_text(&layout.title));
    let _ = write!(
        out,
        ") /Producer (chemviz) /CreationDate (D:{}Z) >>\nendobj\n",
        created.format("%Y%m%d%H%M%S")
    );

    let xref_offset = out.len();
    let _ = write!(out, "xref\n0 {}\n0000000000 65535 f \n", object_count + 1);
    for offset in &offsets {
        let _ = write!(out, "{offset:010} 00000 n \n");
    }
    let _ = write!(
        out,
        "trailer\n<< /Size {} /Root 1 0 R /Info {info_obj} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        object_count + 1
    );

    out
}
