//! Minimal PDF 1.4 writer for the compound report table.
//!
//! Uses the built-in Helvetica font, so the output needs no embedded font data.
//! Text outside printable ASCII is replaced with `?`.

use chrono::{DateTime, Utc};

use super::{COLUMNS, ReportError, ReportRow};

const PAGE_WIDTH: f64 = 612.0;
const PAGE_HEIGHT: f64 = 792.0;
const MARGIN: f64 = 56.0;
const COLUMN_WIDTH: f64 = 100.0;
const ROW_HEIGHT: f64 = 20.0;
const CELL_PADDING: f64 = 6.0;
const FONT_SIZE: f64 = 10.0;
const TITLE_FONT_SIZE: f64 = 16.0;
const FIRST_PAGE_TABLE_TOP: f64 = 690.0;
const TABLE_TOP: f64 = PAGE_HEIGHT - MARGIN;

const HEADER_FILL: Rgb = Rgb::hex(0xCA8A04);
const COLUMN_FILLS: [Rgb; 2] = [Rgb::hex(0xEAB308), Rgb::hex(0xFDE047)];

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const FONT_ID: usize = 3;
const FIRST_PAGE_ID: usize = 4;

#[derive(Clone, Copy)]
struct Rgb(f64, f64, f64);

impl Rgb {
    const fn hex(value: u32) -> Self {
        Rgb(
            ((value >> 16) & 0xFF) as f64 / 255.0,
            ((value >> 8) & 0xFF) as f64 / 255.0,
            (value & 0xFF) as f64 / 255.0,
        )
    }
}

/// Renders the report as a paginated PDF table, with the header row repeated on every page.
pub fn render_pdf(rows: &[ReportRow], generated_at: DateTime<Utc>) -> Result<Vec<u8>, ReportError> {
    if rows.is_empty() {
        return Err(ReportError::Empty);
    }

    let title = format!("{} Years Compound Report", rows.len());
    let subtitle = format!(
        "Generated on {}",
        generated_at.format("%B %-d, %Y at %H:%M:%S UTC")
    );

    let pages = paginate(rows.len());
    let mut streams = Vec::with_capacity(pages.len());
    for (page_idx, range) in pages.iter().enumerate() {
        let mut content = String::new();
        let table_top = if page_idx == 0 {
            draw_text(&mut content, MARGIN, 740.0, TITLE_FONT_SIZE, &title);
            draw_text(&mut content, MARGIN, 722.0, FONT_SIZE, &subtitle);
            FIRST_PAGE_TABLE_TOP
        } else {
            TABLE_TOP
        };
        draw_table(&mut content, table_top, &rows[range.clone()]);
        streams.push(content);
    }

    Ok(assemble(&streams))
}

/// Splits `row_count` rows into per-page ranges.
fn paginate(row_count: usize) -> Vec<std::ops::Range<usize>> {
    let slots = |top: f64| (((top - MARGIN) / ROW_HEIGHT).floor() as usize).saturating_sub(1);
    let first_capacity = slots(FIRST_PAGE_TABLE_TOP);
    let capacity = slots(TABLE_TOP);

    let mut pages = Vec::new();
    let mut start = 0;
    while start < row_count {
        let take = if pages.is_empty() { first_capacity } else { capacity };
        let end = (start + take).min(row_count);
        pages.push(start..end);
        start = end;
    }
    pages
}

fn draw_table(out: &mut String, top: f64, rows: &[ReportRow]) {
    let left = MARGIN;
    let right = left + COLUMN_WIDTH * COLUMNS.len() as f64;

    let header_bottom = top - ROW_HEIGHT;
    for (col, label) in COLUMNS.iter().enumerate() {
        let x = left + COLUMN_WIDTH * col as f64;
        fill_rect(out, x, header_bottom, COLUMN_WIDTH, ROW_HEIGHT, HEADER_FILL);
        draw_text(out, x + CELL_PADDING, header_bottom + CELL_PADDING, FONT_SIZE, label);
    }
    stroke_line(out, left, right, header_bottom, 2.0);

    for (idx, row) in rows.iter().enumerate() {
        let bottom = header_bottom - ROW_HEIGHT * (idx + 1) as f64;
        for (col, cell) in row.cells().iter().enumerate() {
            let x = left + COLUMN_WIDTH * col as f64;
            fill_rect(out, x, bottom, COLUMN_WIDTH, ROW_HEIGHT, COLUMN_FILLS[col % 2]);
            draw_text(out, x + CELL_PADDING, bottom + CELL_PADDING, FONT_SIZE, cell);
        }
        stroke_line(out, left, right, bottom, 0.5);
    }
}

fn fill_rect(out: &mut String, x: f64, y: f64, width: f64, height: f64, color: Rgb) {
    out.push_str(&format!(
        "{:.3} {:.3} {:.3} rg {x:.2} {y:.2} {width:.2} {height:.2} re f\n",
        color.0, color.1, color.2
    ));
}

fn stroke_line(out: &mut String, x1: f64, x2: f64, y: f64, width: f64) {
    out.push_str(&format!(
        "0 0 0 RG {width:.2} w {x1:.2} {y:.2} m {x2:.2} {y:.2} l S\n"
    ));
}

fn draw_text(out: &mut String, x: f64, y: f64, size: f64, text: &str) {
    out.push_str(&format!(
        "0 0 0 rg BT /F1 {size:.1} Tf {x:.2} {y:.2} Td ({}) Tj ET\n",
        escape_text(text)
    ));
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            ' '..='~' => escaped.push(ch),
            _ => escaped.push('?'),
        }
    }
    escaped
}

fn assemble(streams: &[String]) -> Vec<u8> {
    let mut doc = String::from("%PDF-1.4\n");
    let mut offsets = Vec::new();
    let mut push_object = |doc: &mut String, id: usize, body: &str| {
        offsets.push(doc.len());
        doc.push_str(&format!("{id} 0 obj\n{body}\nendobj\n"));
    };

    let page_ids: Vec<usize> = (0..streams.len())
        .map(|idx| FIRST_PAGE_ID + idx * 2)
        .collect();
    let kids = page_ids
        .iter()
        .map(|id| format!("{id} 0 R"))
        .collect::<Vec<_>>()
        .join(" ");

    push_object(
        &mut doc,
        CATALOG_ID,
        &format!("<< /Type /Catalog /Pages {PAGES_ID} 0 R >>"),
    );
    push_object(
        &mut doc,
        PAGES_ID,
        &format!(
            "<< /Type /Pages /Kids [{kids}] /Count {} >>",
            page_ids.len()
        ),
    );
    push_object(
        &mut doc,
        FONT_ID,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    );

    for (page_id, content) in page_ids.iter().zip(streams) {
        let content_id = page_id + 1;
        push_object(
            &mut doc,
            *page_id,
            &format!(
                "<< /Type /Page /Parent {PAGES_ID} 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 {FONT_ID} 0 R >> >> /Contents {content_id} 0 R >>"
            ),
        );
        push_object(
            &mut doc,
            content_id,
            &format!(
                "<< /Length {} >>\nstream\n{content}endstream",
                content.len()
            ),
        );
    }

    let xref_offset = doc.len();
    doc.push_str(&format!("xref\n0 {}\n", offsets.len() + 1));
    doc.push_str("0000000000 65535 f \n");
    for offset in &offsets {
        doc.push_str(&format!("{offset:010} 00000 n \n"));
    }
    doc.push_str(&format!(
        "trailer\n<< /Size {} /Root {CATALOG_ID} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        offsets.len() + 1
    ));

    doc.into_bytes()
}
