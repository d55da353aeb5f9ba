//! Core domain entities: boletos, lotes and the listing filter
//!
//! Entities are validated at construction and immutable afterwards. A value
//! that would violate an invariant never becomes an entity: constructors
//! return `Error::Validation` and no partially-valid instance exists.
//! Rows read back from storage are re-validated through the same checks.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

/// Canonical lote name: left-zero-padded to 4 characters ("17" -> "0017").
/// Names already 4 characters or longer are returned unchanged.
pub fn canonical_lote_name(name: &str) -> String {
    format!("{:0>4}", name)
}

/// A single payment slip record
///
/// `id` is assigned by storage and absent before persistence. `active`
/// defaults to true and `created_at` to the construction time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Boleto {
    id: Option<i64>,
    payer_name: String,
    lote_id: i64,
    amount: f64,
    digit_line: String,
    active: bool,
    created_at: DateTime<Utc>,
}

impl Boleto {
    /// Create a new, not-yet-persisted boleto
    ///
    /// Payer name and digit line are trimmed; the trimmed values must be
    /// non-empty. Amount must be a finite number greater than zero and the
    /// lote id must be positive.
    pub fn new(payer_name: &str, lote_id: i64, amount: f64, digit_line: &str) -> Result<Self> {
        Self::build(None, payer_name, lote_id, amount, digit_line, true, Utc::now())
    }

    /// Re-hydrate a boleto from storage, re-running every validation
    pub fn restore(
        id: i64,
        payer_name: &str,
        lote_id: i64,
        amount: f64,
        digit_line: &str,
        active: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        Self::build(Some(id), payer_name, lote_id, amount, digit_line, active, created_at)
    }

    fn build(
        id: Option<i64>,
        payer_name: &str,
        lote_id: i64,
        amount: f64,
        digit_line: &str,
        active: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let payer_name = payer_name.trim();
        if payer_name.is_empty() {
            return Err(Error::Validation("payer name must not be empty".to_string()));
        }
        if lote_id <= 0 {
            return Err(Error::Validation("lote id must be greater than zero".to_string()));
        }
        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::Validation("amount must be greater than zero".to_string()));
        }
        let digit_line = digit_line.trim();
        if digit_line.is_empty() {
            return Err(Error::Validation("digit line must not be empty".to_string()));
        }

        Ok(Self {
            id,
            payer_name: payer_name.to_string(),
            lote_id,
            amount,
            digit_line: digit_line.to_string(),
            active,
            created_at,
        })
    }

    /// Same boleto with a storage-assigned identifier
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Storage identifier, if assigned
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Payer ("sacado") name
    pub fn payer_name(&self) -> &str {
        &self.payer_name
    }

    /// Identifier of the owning lote
    pub fn lote_id(&self) -> i64 {
        self.lote_id
    }

    /// Slip amount in BRL
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Printed digit line ("linha digitável"), opaque
    pub fn digit_line(&self) -> &str {
        &self.digit_line
    }

    /// Whether the boleto is active
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A billing unit ("lote") that boletos belong to
///
/// Boleto unit codes from CSV imports resolve against lote names in
/// canonical zero-padded form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lote {
    id: Option<i64>,
    name: String,
    active: bool,
    created_at: DateTime<Utc>,
}

impl Lote {
    /// Create a new, not-yet-persisted lote
    pub fn new(name: &str) -> Result<Self> {
        Self::build(None, name, true, Utc::now())
    }

    /// Re-hydrate a lote from storage
    pub fn restore(id: i64, name: &str, active: bool, created_at: DateTime<Utc>) -> Result<Self> {
        Self::build(Some(id), name, active, created_at)
    }

    fn build(id: Option<i64>, name: &str, active: bool, created_at: DateTime<Utc>) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("lote name must not be empty".to_string()));
        }
        Ok(Self {
            id,
            name: name.to_string(),
            active,
            created_at,
        })
    }

    /// Same lote with a storage-assigned identifier
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Storage identifier, if assigned
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Name as stored
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name in canonical zero-padded form
    pub fn canonical_name(&self) -> String {
        canonical_lote_name(&self.name)
    }

    /// Whether the lote is active
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Filter for listing active boletos; empty filter matches everything
#[derive(Debug, Clone, Default)]
pub struct BoletoFilter {
    /// Case-insensitive substring of the payer name
    pub payer_name: Option<String>,
    /// Exact lote identifier
    pub lote_id: Option<i64>,
    /// Inclusive lower amount bound
    pub min_amount: Option<f64>,
    /// Inclusive upper amount bound
    pub max_amount: Option<f64>,
}
