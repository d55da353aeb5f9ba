//! Paginated tabular PDF report over boletos
//!
//! Single-pass layout: a bold centered title on the first page, one bold
//! header row followed by a rule, then data rows flowing down the page. When
//! the cursor would cross the bottom margin a fresh page is appended and
//! drawing continues there; the header row is not repeated on continuation
//! pages. A generation-date footer lands on the page holding the cursor when
//! the body finishes, which in this flow is the last page.

use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};

use crate::domain::Boleto;
use crate::error::{Error, Result};
use crate::pdf::fonts::{self, Face};

/// Boleto fields the report knows how to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportField {
    Id,
    PayerName,
    LoteId,
    Amount,
    DigitLine,
    Active,
    CreatedAt,
}

impl ReportField {
    /// Pixel width for columns with a fixed budget; the rest share what is
    /// left of the table width equally.
    fn fixed_width(self) -> Option<f64> {
        match self {
            ReportField::Id => Some(40.0),
            ReportField::PayerName => Some(150.0),
            ReportField::LoteId => Some(60.0),
            ReportField::Amount => Some(80.0),
            ReportField::DigitLine => Some(150.0),
            _ => None,
        }
    }

    /// Numeric columns align to the right edge of their column
    fn right_aligned(self) -> bool {
        matches!(
            self,
            ReportField::Id | ReportField::LoteId | ReportField::Amount
        )
    }

    /// Render the field value: amounts with a comma decimal separator,
    /// dates as dd/mm/yyyy, booleans as Sim/Não, a missing id as a dash.
    fn value(self, boleto: &Boleto) -> String {
        match self {
            ReportField::Id => boleto
                .id()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            ReportField::PayerName => boleto.payer_name().to_string(),
            ReportField::LoteId => boleto.lote_id().to_string(),
            ReportField::Amount => format_amount(boleto.amount()),
            ReportField::DigitLine => boleto.digit_line().to_string(),
            ReportField::Active => if boleto.is_active() { "Sim" } else { "Não" }.to_string(),
            ReportField::CreatedAt => boleto.created_at().format("%d/%m/%Y").to_string(),
        }
    }
}

/// Fixed two decimals, comma as the decimal separator: 182.54 -> "182,54"
pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount).replace('.', ",")
}

/// One report column: which field it shows and the header text above it
#[derive(Debug, Clone)]
pub struct ReportColumn {
    pub field: ReportField,
    pub label: String,
}

impl ReportColumn {
    pub fn new(field: ReportField, label: &str) -> Self {
        Self {
            field,
            label: label.to_string(),
        }
    }
}

/// The standard column set, in display order
pub fn default_columns() -> Vec<ReportColumn> {
    vec![
        ReportColumn::new(ReportField::Id, "ID"),
        ReportColumn::new(ReportField::PayerName, "Nome do Sacado"),
        ReportColumn::new(ReportField::LoteId, "ID do Lote"),
        ReportColumn::new(ReportField::Amount, "Valor (R$)"),
        ReportColumn::new(ReportField::DigitLine, "Linha Digitável"),
        ReportColumn::new(ReportField::Active, "Ativo"),
        ReportColumn::new(ReportField::CreatedAt, "Data de Criação"),
    ]
}

/// Page geometry and type sizes, in points
#[derive(Debug, Clone)]
pub struct ReportLayout {
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    pub font_size: f64,
    pub title_font_size: f64,
    pub footer_font_size: f64,
    pub line_height: f64,
}

impl Default for ReportLayout {
    fn default() -> Self {
        // A4 portrait
        Self {
            page_width: 595.28,
            page_height: 841.89,
            margin: 50.0,
            font_size: 10.0,
            title_font_size: 16.0,
            footer_font_size: 8.0,
            line_height: 20.0,
        }
    }
}

/// Accumulates text and line operations for the page being drawn
struct PageOps {
    operations: Vec<Operation>,
}

impl PageOps {
    fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    fn draw_text(&mut self, text: &str, x: f64, y: f64, face: Face, size: f64) {
        let font = match face {
            Face::Regular => "F1",
            Face::Bold => "F2",
        };
        self.operations.push(Operation::new("BT", vec![]));
        self.operations
            .push(Operation::new("Tf", vec![font.into(), size.into()]));
        self.operations
            .push(Operation::new("Td", vec![x.into(), y.into()]));
        self.operations.push(Operation::new(
            "Tj",
            vec![Object::String(
                fonts::encode_win_ansi(text),
                StringFormat::Literal,
            )],
        ));
        self.operations.push(Operation::new("ET", vec![]));
    }

    fn draw_rule(&mut self, x1: f64, x2: f64, y: f64) {
        self.operations.push(Operation::new("w", vec![1.into()]));
        self.operations
            .push(Operation::new("m", vec![x1.into(), y.into()]));
        self.operations
            .push(Operation::new("l", vec![x2.into(), y.into()]));
        self.operations.push(Operation::new("S", vec![]));
    }
}

/// Resolve every column to a concrete width
///
/// Fixed-budget columns take theirs; the remaining table width is split
/// equally among the rest. With no unfixed columns the split is skipped.
fn column_widths(columns: &[ReportColumn], table_width: f64) -> Vec<f64> {
    let fixed_total: f64 = columns
        .iter()
        .filter_map(|c| c.field.fixed_width())
        .sum();
    let unfixed = columns
        .iter()
        .filter(|c| c.field.fixed_width().is_none())
        .count();

    let shared = if unfixed > 0 {
        (table_width - fixed_total) / unfixed as f64
    } else {
        0.0
    };

    columns
        .iter()
        .map(|c| c.field.fixed_width().unwrap_or(shared))
        .collect()
}

/// Cut a value to its column's character budget, ellipsis included
///
/// The budget derives from the column width and an average glyph width of
/// half the font size; values over budget lose their tail to "...".
fn truncate_to_column(value: &str, column_width: f64, font_size: f64) -> String {
    let max_chars = (column_width / (font_size * 0.5)).floor() as usize;
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let kept: String = value.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Render boletos into a paginated A4 PDF table, returned as raw bytes
pub fn generate_report(
    boletos: &[Boleto],
    columns: &[ReportColumn],
    layout: &ReportLayout,
) -> Result<Vec<u8>> {
    let widths = column_widths(columns, layout.page_width - 2.0 * layout.margin);

    let mut finished: Vec<PageOps> = Vec::new();
    let mut page = PageOps::new();
    let mut y = layout.page_height - layout.margin;

    // Title, bold and centered, first page only
    let title = "Relatório de Boletos";
    let title_x = layout.page_width / 2.0
        - fonts::text_width(title, Face::Bold, layout.title_font_size) / 2.0;
    page.draw_text(title, title_x, y, Face::Bold, layout.title_font_size);
    y -= layout.line_height * 2.0;

    // Header row and rule; not repeated on continuation pages
    let mut x = layout.margin;
    for (column, width) in columns.iter().zip(&widths) {
        page.draw_text(&column.label, x, y, Face::Bold, layout.font_size);
        x += width;
    }
    y -= layout.line_height;
    page.draw_rule(layout.margin, layout.page_width - layout.margin, y);
    y -= layout.line_height / 2.0;

    for boleto in boletos {
        if y < layout.margin + layout.line_height {
            finished.push(std::mem::replace(&mut page, PageOps::new()));
            y = layout.page_height - layout.margin;
        }

        let mut x = layout.margin;
        for (column, width) in columns.iter().zip(&widths) {
            let value = column.field.value(boleto);
            let text = truncate_to_column(&value, *width, layout.font_size);

            let text_x = if column.field.right_aligned() {
                x + width - fonts::text_width(&text, Face::Regular, layout.font_size) - 5.0
            } else {
                x
            };
            page.draw_text(&text, text_x, y, Face::Regular, layout.font_size);
            x += width;
        }
        y -= layout.line_height;
    }

    // Footer on the page the cursor ended on
    let footer = format!("Relatório gerado em: {}", Utc::now().format("%d/%m/%Y"));
    page.draw_text(
        &footer,
        layout.margin,
        layout.margin / 2.0,
        Face::Regular,
        layout.footer_font_size,
    );
    finished.push(page);

    assemble_document(finished, layout)
}

/// Turn the accumulated page operations into a serialized PDF
fn assemble_document(pages: Vec<PageOps>, layout: &ReportLayout) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");

    let regular_id = doc.add_object(fonts::font_dictionary(Face::Regular));
    let bold_id = doc.add_object(fonts::font_dictionary(Face::Bold));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => Object::Reference(regular_id),
            "F2" => Object::Reference(bold_id),
        },
    });

    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());

    for page in pages {
        let content = Content {
            operations: page.operations,
        };
        let encoded = content
            .encode()
            .map_err(|e| Error::Document(format!("failed to encode page content: {}", e)))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                0.into(),
                0.into(),
                layout.page_width.into(),
                layout.page_height.into(),
            ],
            "Contents" => Object::Reference(content_id),
            "Resources" => Object::Reference(resources_id),
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => page_count,
            "Kids" => kids,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| Error::Document(format!("failed to serialize report: {}", e)))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::page_count;

    fn boleto(id: i64, name: &str, lote: i64, amount: f64) -> Boleto {
        Boleto::new(name, lote, amount, "123456123456123456")
            .unwrap()
            .with_id(id)
    }

    fn report_text(bytes: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(bytes).unwrap();
        let count = doc.get_pages().len() as u32;
        (1..=count)
            .map(|page| doc.extract_text(&[page]).unwrap())
            .collect()
    }

    #[test]
    fn test_format_amount_uses_comma_separator() {
        assert_eq!(format_amount(182.54), "182,54");
        assert_eq!(format_amount(10.0), "10,00");
        assert_eq!(format_amount(0.5), "0,50");
    }

    #[test]
    fn test_column_widths_split_leftover_equally() {
        let columns = default_columns();
        let widths = column_widths(&columns, 495.28);

        assert_eq!(widths[0], 40.0);
        assert_eq!(widths[1], 150.0);
        // Ativo and Data de Criação share what the fixed columns left over
        let leftover = (495.28 - 480.0) / 2.0;
        assert!((widths[5] - leftover).abs() < 1e-9);
        assert!((widths[6] - leftover).abs() < 1e-9);
    }

    #[test]
    fn test_column_widths_all_fixed_skips_split() {
        let columns = vec![
            ReportColumn::new(ReportField::Id, "ID"),
            ReportColumn::new(ReportField::Amount, "Valor (R$)"),
        ];
        let widths = column_widths(&columns, 495.28);
        assert_eq!(widths, vec![40.0, 80.0]);
    }

    #[test]
    fn test_truncation_appends_ellipsis() {
        // 80pt column at 10pt font: budget of 16 characters
        let long = "12345678901234567890";
        assert_eq!(truncate_to_column(long, 80.0, 10.0), "1234567890123...");

        let short = "182,54";
        assert_eq!(truncate_to_column(short, 80.0, 10.0), "182,54");
    }

    #[test]
    fn test_single_page_report() {
        let boletos = vec![
            boleto(1, "JOSE DA SILVA", 6, 182.54),
            boleto(2, "MARCOS ROBERTO", 7, 178.20),
        ];
        let bytes = generate_report(&boletos, &default_columns(), &ReportLayout::default())
            .unwrap();

        assert_eq!(page_count(&bytes).unwrap(), 1);

        let text = report_text(&bytes);
        assert!(text[0].contains("Relatório de Boletos"));
        assert!(text[0].contains("JOSE DA SILVA"));
        assert!(text[0].contains("182,54"));
        assert!(text[0].contains("Relatório gerado em:"));
    }

    #[test]
    fn test_fifty_rows_paginate_to_two_pages() {
        // With the default layout the first page holds 33 rows (title and
        // header take room above them) and continuation pages hold 37.
        let boletos: Vec<Boleto> = (1..=50)
            .map(|i| boleto(i, &format!("SACADO {}", i), i, 182.54))
            .collect();
        let bytes = generate_report(&boletos, &default_columns(), &ReportLayout::default())
            .unwrap();

        assert_eq!(page_count(&bytes).unwrap(), 2);

        let text = report_text(&bytes);
        // Header row only on the first page, footer only on the last
        assert!(text[0].contains("Nome do Sacado"));
        assert!(!text[1].contains("Nome do Sacado"));
        assert!(!text[0].contains("Relatório gerado em:"));
        assert!(text[1].contains("Relatório gerado em:"));
        // Row 33 closes page one, row 34 opens page two
        assert!(text[0].contains("SACADO 33"));
        assert!(text[1].contains("SACADO 34"));
    }

    #[test]
    fn test_every_amount_renders_with_comma() {
        let boletos: Vec<Boleto> = (1..=5).map(|i| boleto(i, "SACADO", i, 182.54)).collect();
        let bytes = generate_report(&boletos, &default_columns(), &ReportLayout::default())
            .unwrap();

        let text = report_text(&bytes).join("\n");
        assert_eq!(text.matches("182,54").count(), 5);
    }
}
