//! CSV import: the semicolon dialect parser and the record-to-entity mapper
//!
//! The dialect is deliberately naive: `;` separates fields, the first line
//! names them, and there is no quoting or escaping, so a semicolon inside a
//! value splits it. The reader mirrors that instead of fixing it.

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::domain::{canonical_lote_name, Boleto};
use crate::error::{Error, Result};
use crate::store::LoteDirectory;

/// One raw CSV row, keyed off the header names
/// `nome`, `unidade`, `valor` and `linha_digitavel`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    /// Payer name, untrimmed semantics left to the entity constructor
    pub name: String,
    /// Billing unit code, resolved against lote names after normalization
    pub unit_code: String,
    /// Amount as written in the file
    pub amount_text: String,
    /// Digit line as written in the file
    pub digit_line: String,
}

/// Rows dropped during mapping, counted by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkippedRows {
    /// Unit code did not resolve to a known active lote
    pub unknown_lote: usize,
    /// Amount was not a finite positive number
    pub invalid_amount: usize,
    /// Entity validation rejected the row
    pub invalid_record: usize,
}

impl SkippedRows {
    /// Total number of dropped rows
    pub fn total(&self) -> usize {
        self.unknown_lote + self.invalid_amount + self.invalid_record
    }
}

/// Result of mapping parsed records to entities
#[derive(Debug, Clone)]
pub struct MapOutcome {
    /// Validated boletos, in input order
    pub boletos: Vec<Boleto>,
    /// Drop counts for rows that did not survive
    pub skipped: SkippedRows,
}

/// Positions of the known columns within the header row
struct HeaderColumns {
    name: Option<usize>,
    unit_code: Option<usize>,
    amount_text: Option<usize>,
    digit_line: Option<usize>,
}

impl HeaderColumns {
    fn locate(headers: &StringRecord) -> Self {
        let find = |wanted: &str| headers.iter().position(|header| header == wanted);
        Self {
            name: find("nome"),
            unit_code: find("unidade"),
            amount_text: find("valor"),
            digit_line: find("linha_digitavel"),
        }
    }
}

/// A field missing relative to the header count defaults to empty
fn field(row: &StringRecord, index: Option<usize>) -> String {
    index
        .and_then(|i| row.get(i))
        .unwrap_or_default()
        .to_string()
}

/// Parse semicolon-delimited CSV content into raw records
///
/// Values are trimmed, blank lines are skipped, and rows shorter than the
/// header are padded with empty strings. Only structurally impossible input
/// fails: empty content, or a reader-level error, produce `Error::Parse`
/// carrying the raw error text. Field semantics are not checked here.
pub fn parse_records(content: &str) -> Result<Vec<CsvRecord>> {
    if content.trim().is_empty() {
        return Err(Error::Parse("CSV content is empty".to_string()));
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .quoting(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| Error::Parse(e.to_string()))?
        .clone();
    let columns = HeaderColumns::locate(&headers);

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| Error::Parse(e.to_string()))?;

        // A whitespace-only line parses as a single empty field
        if row.len() <= 1 && row.iter().all(|value| value.is_empty()) {
            continue;
        }

        records.push(CsvRecord {
            name: field(&row, columns.name),
            unit_code: field(&row, columns.unit_code),
            amount_text: field(&row, columns.amount_text),
            digit_line: field(&row, columns.digit_line),
        });
    }

    Ok(records)
}

/// Map raw records to validated boletos using the lote directory
///
/// The directory is queried once with the deduplicated set of canonical unit
/// codes. Rows that cannot be mapped are dropped, counted by reason and
/// logged at debug level; the call itself succeeds as long as the directory
/// lookup does. An empty input yields an empty outcome without touching the
/// directory.
pub fn map_to_boletos(records: &[CsvRecord], lotes: &dyn LoteDirectory) -> Result<MapOutcome> {
    if records.is_empty() {
        return Ok(MapOutcome {
            boletos: Vec::new(),
            skipped: SkippedRows::default(),
        });
    }

    // Deduplicate canonical codes preserving first-seen order
    let mut codes: Vec<String> = Vec::new();
    for record in records {
        let code = canonical_lote_name(&record.unit_code);
        if !codes.contains(&code) {
            codes.push(code);
        }
    }

    let known = lotes.find_by_names(&codes)?;

    let mut boletos = Vec::new();
    let mut skipped = SkippedRows::default();

    for record in records {
        let code = canonical_lote_name(&record.unit_code);
        let lote_id = known
            .iter()
            .find(|lote| lote.canonical_name().eq_ignore_ascii_case(&code))
            .and_then(|lote| lote.id());

        let lote_id = match lote_id {
            Some(id) => id,
            None => {
                debug!("row '{}' skipped: unknown lote '{}'", record.name, code);
                skipped.unknown_lote += 1;
                continue;
            }
        };

        let amount = match record.amount_text.trim().parse::<f64>() {
            Ok(value) if value.is_finite() && value > 0.0 => value,
            _ => {
                debug!(
                    "row '{}' skipped: amount '{}' is not a positive number",
                    record.name, record.amount_text
                );
                skipped.invalid_amount += 1;
                continue;
            }
        };

        match Boleto::new(&record.name, lote_id, amount, &record.digit_line) {
            Ok(boleto) => boletos.push(boleto),
            Err(err) => {
                debug!("row '{}' skipped: {}", record.name, err);
                skipped.invalid_record += 1;
            }
        }
    }

    Ok(MapOutcome { boletos, skipped })
}
