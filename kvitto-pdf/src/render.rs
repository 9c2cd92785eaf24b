use std::path::PathBuf;

use printpdf::{
    path::PaintMode, BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm,
    PdfDocument, PdfLayerReference, Point, Rect, Rgb,
};
use thiserror::Error;

use crate::format::format_amount;
use crate::snapshot::InvoiceSnapshot;

/// Branding resolved by the app for one render: the logo (if any) has
/// already been fetched, so rendering itself never touches the network.
#[derive(Debug, Clone, Default)]
pub struct DocumentBranding {
    pub business_name: Option<String>,
    pub tagline: Option<String>,
    pub accent_color: Option<String>,
    pub logo: Option<Vec<u8>>,
    pub footer_text: Option<String>,
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("PdfError: {0}")]
    Pdf(String),
    #[error("Too many line items for a single page")]
    TooManyItems,
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
}

// Layout constants (A4, mm)
const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_X: f32 = 15.0;
const ACCENT_BAR_H: f32 = 6.0;
const LOGO_AREA_W: f32 = 42.0;
const LOGO_MAX_H: f32 = 20.0;
const LOGO_DPI: f32 = 300.0;
const LINE_H: f32 = 4.6;
const SECTION_GAP: f32 = 9.0;
const FOOTER_Y: f32 = 18.0;
// Rows must stop above the totals/notes/footer area.
const CONTENT_FLOOR: f32 = 72.0;
const BODY_WRAP_CHARS: usize = 62;

const DEFAULT_ACCENT: (f32, f32, f32) = (0.13, 0.32, 0.72);
const TEXT_GRAY: f32 = 0.42;

/// Parse `#RRGGBB` into normalized components, falling back to the default
/// accent on anything malformed.
fn parse_accent(hex: Option<&str>) -> (f32, f32, f32) {
    let Some(hex) = hex.map(str::trim).filter(|s| !s.is_empty()) else {
        return DEFAULT_ACCENT;
    };
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return DEFAULT_ACCENT;
    }
    let Ok(value) = u32::from_str_radix(hex, 16) else {
        return DEFAULT_ACCENT;
    };
    (
        ((value >> 16) & 0xff) as f32 / 255.0,
        ((value >> 8) & 0xff) as f32 / 255.0,
        (value & 0xff) as f32 / 255.0,
    )
}

fn push_line(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    font_size: f32,
    x: f32,
    y: f32,
) {
    layer.use_text(text, font_size, Mm(x), Mm(y), font);
}

/// printpdf doesn't expose text metrics for builtin fonts; this pragmatic
/// estimate is good enough for numeric columns and short labels.
fn text_width_est(text: &str, font_size: f32) -> f32 {
    (text.chars().count() as f32) * font_size * 0.42
}

fn push_line_right(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    font_size: f32,
    x_right: f32,
    y: f32,
) {
    let x = (x_right - text_width_est(text, font_size)).max(0.0);
    push_line(layer, font, text, font_size, x, y);
}

fn push_line_centered(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    font_size: f32,
    y: f32,
) {
    let x = ((PAGE_W - text_width_est(text, font_size)) / 2.0).max(MARGIN_X);
    push_line(layer, font, text, font_size, x, y);
}

fn wrap_text_lines(input: &str, max_chars: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in input.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        if current.len() + 1 + word.len() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            out.push(current);
            current = word.to_string();
        }
    }

    if !current.is_empty() {
        out.push(current);
    }

    out
}

fn draw_rule(layer: &PdfLayerReference, x1: f32, x2: f32, y: f32, thickness: f32) {
    layer.set_outline_thickness(thickness);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x1), Mm(y)), false),
            (Point::new(Mm(x2), Mm(y)), false),
        ],
        is_closed: false,
    });
}

fn fill_rect(
    layer: &PdfLayerReference,
    color: (f32, f32, f32),
    x: f32,
    y_top: f32,
    w: f32,
    h: f32,
) {
    layer.set_fill_color(Color::Rgb(Rgb::new(color.0, color.1, color.2, None)));
    let rect = Rect::new(Mm(x), Mm(y_top - h), Mm(x + w), Mm(y_top)).with_mode(PaintMode::Fill);
    layer.add_rect(rect);
    set_text_black(layer);
}

fn set_text_black(layer: &PdfLayerReference) {
    layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
}

fn set_text_gray(layer: &PdfLayerReference) {
    layer.set_fill_color(Color::Rgb(Rgb::new(TEXT_GRAY, TEXT_GRAY, TEXT_GRAY, None)));
}

/// Lay out the fixed single-page invoice template.
pub fn render_invoice(
    snapshot: &InvoiceSnapshot,
    branding: &DocumentBranding,
) -> Result<Vec<u8>, RenderError> {
    let (doc, page1, layer1) = PdfDocument::new(
        format!("Invoice {}", snapshot.number),
        Mm(PAGE_W),
        Mm(PAGE_H),
        "Layer 1",
    );
    let layer = doc.get_page(page1).get_layer(layer1);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;

    let accent = parse_accent(branding.accent_color.as_deref());
    let content_left = MARGIN_X;
    let content_right = PAGE_W - MARGIN_X;

    // Accent bar across the very top.
    fill_rect(&layer, accent, 0.0, PAGE_H, PAGE_W, ACCENT_BAR_H);

    let mut y = PAGE_H - ACCENT_BAR_H - 14.0;
    let header_top = y;

    // Branding header: name + tagline left, logo right.
    let business_name = branding
        .business_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("Invoice");
    push_line(&layer, &font_bold, business_name, 16.0, content_left, y);
    y -= 6.4;
    if let Some(tagline) = branding
        .tagline
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        set_text_gray(&layer);
        push_line(&layer, &font, tagline, 9.0, content_left, y);
        set_text_black(&layer);
        y -= LINE_H;
    }

    let logo_h = draw_logo(&layer, branding.logo.as_deref(), header_top, content_right);
    y = y.min(header_top - logo_h);
    y -= SECTION_GAP;

    // Invoice metadata, right-aligned.
    push_line_right(
        &layer,
        &font_bold,
        &format!("Invoice {}", snapshot.number),
        11.0,
        content_right,
        y,
    );
    y -= LINE_H;
    if let Some(issued) = &snapshot.issued_at {
        push_line_right(
            &layer,
            &font,
            &format!("Issued: {}", issued.display()),
            9.0,
            content_right,
            y,
        );
        y -= LINE_H;
    }
    if let Some(due) = &snapshot.due_date {
        push_line_right(
            &layer,
            &font,
            &format!("Due: {}", due.display()),
            9.0,
            content_right,
            y,
        );
        y -= LINE_H;
    }
    y -= SECTION_GAP;

    // Bill-to block.
    set_text_gray(&layer);
    push_line(&layer, &font_bold, "BILL TO", 8.0, content_left, y);
    set_text_black(&layer);
    y -= LINE_H;
    if let Some(name) = snapshot
        .bill_to
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        push_line(&layer, &font_bold, name, 10.0, content_left, y);
        y -= LINE_H;
    }
    for line in &snapshot.bill_to.lines {
        push_line(&layer, &font, line, 9.0, content_left, y);
        y -= LINE_H;
    }
    y -= SECTION_GAP;

    // Item table header.
    let qty_x = content_left;
    let desc_x = content_left + 16.0;
    set_text_gray(&layer);
    push_line(&layer, &font_bold, "QTY", 8.0, qty_x, y);
    push_line(&layer, &font_bold, "DESCRIPTION", 8.0, desc_x, y);
    push_line_right(&layer, &font_bold, "AMOUNT", 8.0, content_right, y);
    set_text_black(&layer);
    y -= 2.2;
    layer.set_outline_color(Color::Rgb(Rgb::new(accent.0, accent.1, accent.2, None)));
    draw_rule(&layer, content_left, content_right, y, 0.6);
    layer.set_outline_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    y -= 6.0;

    // Item rows.
    for entry in &snapshot.lines {
        let body_lines = entry
            .body
            .as_deref()
            .map(|body| wrap_text_lines(body, BODY_WRAP_CHARS))
            .unwrap_or_default();
        let row_lines = (entry.title.is_some() as usize + body_lines.len()).max(1);
        let row_h = row_lines as f32 * LINE_H + 2.4;
        if y - row_h < CONTENT_FLOOR {
            return Err(RenderError::TooManyItems);
        }

        push_line(&layer, &font, &entry.quantity.to_string(), 9.5, qty_x, y);
        push_line_right(
            &layer,
            &font,
            &format_amount(entry.amount, &snapshot.currency),
            9.5,
            content_right,
            y,
        );

        let mut row_y = y;
        if let Some(title) = &entry.title {
            push_line(&layer, &font_bold, title, 9.5, desc_x, row_y);
            row_y -= LINE_H;
        }
        set_text_gray(&layer);
        for line in &body_lines {
            push_line(&layer, &font, line, 9.0, desc_x, row_y);
            row_y -= LINE_H;
        }
        set_text_black(&layer);

        y -= row_h;
    }

    y -= 2.0;

    // Totals block, right-aligned with an accent stripe above the total.
    let totals_label_x = content_right - 58.0;
    push_line(&layer, &font, "Subtotal", 9.5, totals_label_x, y);
    push_line_right(
        &layer,
        &font,
        &format_amount(snapshot.subtotal, &snapshot.currency),
        9.5,
        content_right,
        y,
    );
    y -= LINE_H + 0.8;
    if !snapshot.tax.is_zero() {
        push_line(&layer, &font, "Tax", 9.5, totals_label_x, y);
        push_line_right(
            &layer,
            &font,
            &format_amount(snapshot.tax, &snapshot.currency),
            9.5,
            content_right,
            y,
        );
        y -= LINE_H + 0.8;
    }
    fill_rect(&layer, accent, totals_label_x, y + 3.2, content_right - totals_label_x, 0.8);
    y -= 1.4;
    push_line(&layer, &font_bold, "Total", 11.0, totals_label_x, y);
    push_line_right(
        &layer,
        &font_bold,
        &format_amount(snapshot.total, &snapshot.currency),
        11.0,
        content_right,
        y,
    );
    y -= SECTION_GAP;

    // Optional notes, left side.
    if let Some(notes) = snapshot
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        set_text_gray(&layer);
        push_line(&layer, &font_bold, "NOTES", 8.0, content_left, y);
        y -= LINE_H;
        for line in wrap_text_lines(notes, 90) {
            push_line(&layer, &font, &line, 9.0, content_left, y);
            y -= LINE_H;
        }
        set_text_black(&layer);
    }

    // Footer.
    set_text_gray(&layer);
    let mut footer_y = FOOTER_Y;
    if let Some(footer) = branding
        .footer_text
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        for line in wrap_text_lines(footer, 95) {
            push_line_centered(&layer, &font, &line, 8.0, footer_y);
            footer_y -= 3.8;
        }
    }
    push_line_centered(
        &layer,
        &font,
        "Thank you for your business!",
        9.0,
        FOOTER_Y + 5.0,
    );
    set_text_black(&layer);

    let mut writer = std::io::BufWriter::new(Vec::<u8>::new());
    doc.save(&mut writer)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    writer
        .into_inner()
        .map_err(|e| RenderError::Pdf(e.to_string()))
}

/// Place the logo in the reserved top-right area. Decode failures degrade to
/// no logo; the document always renders.
fn draw_logo(
    layer: &PdfLayerReference,
    logo: Option<&[u8]>,
    header_top: f32,
    content_right: f32,
) -> f32 {
    let Some(bytes) = logo else {
        return 0.0;
    };
    let image = match printpdf::image_crate::load_from_memory(bytes) {
        Ok(image) => image,
        Err(err) => {
            tracing::debug!("branding logo could not be decoded: {err}");
            return 0.0;
        }
    };

    let px_w = image.width().max(1) as f32;
    let px_h = image.height().max(1) as f32;
    let natural_w = px_w / LOGO_DPI * 25.4;
    let natural_h = px_h / LOGO_DPI * 25.4;

    let scale = (LOGO_AREA_W / natural_w)
        .min(LOGO_MAX_H / natural_h)
        .min(1.0)
        .max(0.01);
    let scaled_w = natural_w * scale;
    let scaled_h = natural_h * scale;

    let logo_x = (content_right - scaled_w).max(0.0);
    // `use_text` takes a baseline; the image transform takes a bottom edge.
    let logo_bottom = header_top + 4.0 - scaled_h;

    let pdf_image = Image::from_dynamic_image(&image);
    pdf_image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(logo_x)),
            translate_y: Some(Mm(logo_bottom)),
            rotate: None,
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(LOGO_DPI),
        },
    );

    scaled_h
}

/// Write rendered bytes to the scoped temp location for this invoice,
/// replacing any document from an earlier render.
pub fn write_document(bytes: &[u8], number: &str) -> Result<PathBuf, RenderError> {
    let dir = std::env::temp_dir().join("kvitto");
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(format!("invoice-{}.pdf", sanitize(number)));
    if path.exists() {
        std::fs::remove_file(&path)?;
    }
    std::fs::write(&path, bytes)?;
    Ok(path)
}

fn sanitize(number: &str) -> String {
    number
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::InvoiceDraft;

    fn sample_snapshot() -> InvoiceSnapshot {
        let draft: InvoiceDraft = serde_json::from_str(
            r#"{
                "number": "INV-0042",
                "currency": "USD",
                "items": [
                    {"title": "Labor", "description": "Drywall repair in the hallway", "quantity": 2, "unitPrice": "10"},
                    {"description": "Materials – Joint compound and tape", "quantity": 1, "unitPrice": "5"}
                ],
                "tax": "2",
                "clientName": "Acme Inc",
                "notes": "Net 30."
            }"#,
        )
        .unwrap();
        InvoiceSnapshot::from_draft(&draft)
    }

    #[test]
    fn rendered_document_is_a_pdf() {
        let bytes = render_invoice(&sample_snapshot(), &DocumentBranding::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn branding_without_decodable_logo_still_renders() {
        let branding = DocumentBranding {
            business_name: Some("Dana's Drywall".to_string()),
            tagline: Some("Smooth walls, fair prices".to_string()),
            accent_color: Some("#aa3355".to_string()),
            logo: Some(vec![0, 1, 2, 3]),
            footer_text: Some("Payable within 30 days.".to_string()),
        };
        let bytes = render_invoice(&sample_snapshot(), &branding).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn oversized_item_lists_are_rejected() {
        let mut snapshot = sample_snapshot();
        let template = snapshot.lines[0].clone();
        snapshot.lines = std::iter::repeat(template).take(80).collect();
        assert!(matches!(
            render_invoice(&snapshot, &DocumentBranding::default()),
            Err(RenderError::TooManyItems)
        ));
    }

    #[test]
    fn accent_parsing_handles_malformed_input() {
        assert_eq!(parse_accent(Some("#336699")), (0.2, 0.4, 0.6));
        assert_eq!(parse_accent(Some("336699")), (0.2, 0.4, 0.6));
        assert_eq!(parse_accent(Some("#zzz")), DEFAULT_ACCENT);
        assert_eq!(parse_accent(None), DEFAULT_ACCENT);
    }

    #[test]
    fn wrap_respects_max_width() {
        let lines = wrap_text_lines("one two three four five", 9);
        assert_eq!(lines, vec!["one two", "three", "four five"]);
    }

    #[test]
    fn write_document_replaces_earlier_renders() {
        let first = write_document(b"%PDF-old", "TEST-1/OVERWRITE").unwrap();
        let second = write_document(b"%PDF-new", "TEST-1/OVERWRITE").unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), b"%PDF-new");
        std::fs::remove_file(second).ok();
    }
}
