//! Boleto batch processing library
//!
//! Ingests bulk payment-slip ("boleto") data from semicolon CSV files and
//! multi-page PDF uploads, reconciles each record with its document page,
//! and produces derived artifacts:
//! - one single-page PDF per boleto, named `{id}.pdf`
//! - a recombined multi-page PDF archived per upload
//! - a paginated tabular PDF report
//!
//! # Example
//!
//! ```no_run
//! use boleto_tools::files::FileStore;
//! use boleto_tools::ops;
//! use boleto_tools::store::SqliteStore;
//! use std::path::Path;
//!
//! let store = SqliteStore::open(Path::new("storage/boletos.db")).unwrap();
//! let files = FileStore::new("storage");
//!
//! let csv = "nome;unidade;valor;linha_digitavel\nJOSE DA SILVA;17;182.54;123456123456123456";
//! let outcome = ops::import_csv(&store, &files, csv, "boletos.csv").unwrap();
//! println!("saved {} boletos", outcome.saved.len());
//! ```

pub mod domain;
pub mod error;
pub mod files;
pub mod import;
pub mod ops;
pub mod pdf;
pub mod reconcile;
pub mod store;

// Re-export commonly used items
pub use domain::{Boleto, BoletoFilter, Lote};
pub use error::{Error, Result};
