//! Demo boleto document and matching CSV
//!
//! Builds the 3-page example PDF (one named payer per page) and the
//! semicolon CSV that imports against it. The CLI exposes both for manual
//! end-to-end runs; tests reuse the builder as their PDF fixture.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};

use crate::error::{Error, Result};
use crate::pdf::fonts::{self, Face};

/// One page of the demo document, matching one CSV row
#[derive(Debug, Clone)]
pub struct SamplePage {
    pub payer_name: String,
    pub unit_code: String,
    pub amount: f64,
    pub digit_line: String,
}

impl SamplePage {
    pub fn new(payer_name: &str, unit_code: &str) -> Self {
        Self {
            payer_name: payer_name.to_string(),
            unit_code: unit_code.to_string(),
            amount: 182.54,
            digit_line: "123456123456123456".to_string(),
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }
}

/// The demo roster: three payers across lotes 0019, 0017 and 0018
pub fn demo_pages() -> Vec<SamplePage> {
    vec![
        SamplePage::new("MARCIA CARVALHO", "19").with_amount(128.00),
        SamplePage::new("JOSE DA SILVA", "17").with_amount(182.54),
        SamplePage::new("MARCOS ROBERTO", "18").with_amount(178.20),
    ]
}

/// CSV content matching the given pages, in the import dialect
pub fn sample_csv(pages: &[SamplePage]) -> String {
    let mut content = String::from("nome;unidade;valor;linha_digitavel\n");
    for page in pages {
        content.push_str(&format!(
            "{};{};{:.2};{}\n",
            page.payer_name, page.unit_code, page.amount, page.digit_line
        ));
    }
    content
}

/// Build the demo PDF: one A4-ish page per entry, title plus detail lines
pub fn sample_pdf(pages: &[SamplePage]) -> Result<Vec<u8>> {
    if pages.is_empty() {
        return Err(Error::Document("sample PDF needs at least one page".to_string()));
    }

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
        let amount = format!("{:.2}", page.amount).replace('.', ",");
        let lines = [
            format!("Valor: R$ {}", amount),
            format!("Linha Digitável: {}", page.digit_line),
            format!("Unidade: {}", page.unit_code),
        ];

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F2".into(), 24.into()]),
            Operation::new("Td", vec![50.into(), 800.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(
                    fonts::encode_win_ansi(&format!("BOLETO DE {}", page.payer_name)),
                    StringFormat::Literal,
                )],
            ),
            Operation::new("ET", vec![]),
        ];

        let mut y: i64 = 750;
        for line in &lines {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 14.into()]),
                Operation::new("Td", vec![50.into(), y.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        fonts::encode_win_ansi(line),
                        StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ]);
            y -= 50;
        }

        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| Error::Document(format!("failed to encode page content: {}", e)))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
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
        .map_err(|e| Error::Document(format!("failed to serialize sample PDF: {}", e)))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::page_count;

    #[test]
    fn test_demo_pdf_has_three_pages() {
        let bytes = sample_pdf(&demo_pages()).unwrap();
        assert_eq!(page_count(&bytes).unwrap(), 3);

        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.extract_text(&[1]).unwrap().contains("MARCIA CARVALHO"));
        assert!(doc.extract_text(&[2]).unwrap().contains("JOSE DA SILVA"));
        assert!(doc.extract_text(&[3]).unwrap().contains("MARCOS ROBERTO"));
    }

    #[test]
    fn test_demo_csv_matches_roster() {
        let csv = sample_csv(&demo_pages());
        let mut lines = csv.lines();

        assert_eq!(lines.next(), Some("nome;unidade;valor;linha_digitavel"));
        assert_eq!(
            lines.next(),
            Some("MARCIA CARVALHO;19;128.00;123456123456123456")
        );
        assert_eq!(
            lines.next(),
            Some("JOSE DA SILVA;17;182.54;123456123456123456")
        );
    }

    #[test]
    fn test_empty_roster_is_rejected() {
        assert!(matches!(sample_pdf(&[]), Err(Error::Document(_))));
    }
}
