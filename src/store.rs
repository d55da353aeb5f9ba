//! Storage contracts and the SQLite implementation behind them
//!
//! The engine consumes two seams: `LoteDirectory` for bulk lote lookup during
//! imports and `BoletoStore` for listing and persisting boletos. `SqliteStore`
//! implements both over an embedded database; tests use the in-memory
//! variant. Every row read back is re-hydrated through the domain
//! constructors, so a corrupted row fails validation instead of producing an
//! invalid entity.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use tracing::warn;

use crate::domain::{Boleto, BoletoFilter, Lote};
use crate::error::{Error, Result};

/// Bulk lookup of active lotes by canonical name, case-insensitive
pub trait LoteDirectory {
    fn find_by_names(&self, names: &[String]) -> Result<Vec<Lote>>;
}

/// Listing and persistence of boletos
pub trait BoletoStore {
    /// Active boletos matching the filter, ascending by identifier
    fn list_active(&self, filter: &BoletoFilter) -> Result<Vec<Boleto>>;

    /// Insert (no id) or update (id present), returning the stored entity
    fn save(&self, boleto: &Boleto) -> Result<Boleto>;

    /// Persist a batch inside one transaction, all-or-nothing
    ///
    /// A conflict exists when an active boleto already shares the lote,
    /// including rows inserted earlier in the same call. Conflicts are
    /// collected in input order; any conflict rolls the whole batch back
    /// into `Error::Conflict` listing every one.
    fn save_many(&self, boletos: &[Boleto]) -> Result<Vec<Boleto>>;
}

/// Embedded SQLite store implementing both contracts
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) a database file, parents included
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let store = Self {
            conn: Connection::open(path)?,
        };
        store.setup()?;
        Ok(store)
    }

    /// Fresh in-memory database, used by tests
    pub fn in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.setup()?;
        Ok(store)
    }

    fn setup(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS lotes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                nome TEXT NOT NULL,
                ativo INTEGER NOT NULL DEFAULT 1,
                criado_em TEXT NOT NULL
            )",
            [],
        )?;
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS boletos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                nome_sacado TEXT NOT NULL,
                id_lote INTEGER NOT NULL REFERENCES lotes(id),
                valor REAL NOT NULL,
                linha_digitavel TEXT NOT NULL,
                ativo INTEGER NOT NULL DEFAULT 1,
                criado_em TEXT NOT NULL
            )",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_boletos_id_lote ON boletos(id_lote)",
            [],
        )?;
        Ok(())
    }

    /// Register a lote, stored under its canonical zero-padded name
    ///
    /// An explicit id is honored so fixtures can pin identifier layouts.
    pub fn insert_lote(&self, lote: &Lote) -> Result<Lote> {
        let name = lote.canonical_name();
        let created = lote.created_at().to_rfc3339();

        let id = match lote.id() {
            Some(id) => {
                self.conn.execute(
                    "INSERT INTO lotes (id, nome, ativo, criado_em) VALUES (?1, ?2, ?3, ?4)",
                    params![id, name, lote.is_active(), created],
                )?;
                id
            }
            None => {
                self.conn.execute(
                    "INSERT INTO lotes (nome, ativo, criado_em) VALUES (?1, ?2, ?3)",
                    params![name, lote.is_active(), created],
                )?;
                self.conn.last_insert_rowid()
            }
        };

        Lote::restore(id, &name, lote.is_active(), lote.created_at())
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Validation(format!("stored timestamp '{}' is invalid: {}", raw, e)))
}

/// Raw boleto row before domain re-validation
type BoletoRow = (i64, String, i64, f64, String, bool, String);

fn restore_boleto(row: BoletoRow) -> Result<Boleto> {
    let (id, name, lote_id, amount, digit_line, active, created) = row;
    Boleto::restore(
        id,
        &name,
        lote_id,
        amount,
        &digit_line,
        active,
        parse_timestamp(&created)?,
    )
}

impl LoteDirectory for SqliteStore {
    fn find_by_names(&self, names: &[String]) -> Result<Vec<Lote>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["LOWER(?)"; names.len()].join(", ");
        let sql = format!(
            "SELECT id, nome, ativo, criado_em FROM lotes
             WHERE ativo = 1 AND LOWER(nome) IN ({})
             ORDER BY id",
            placeholders
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(names.iter()), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut lotes = Vec::new();
        for row in rows {
            let (id, name, active, created) = row?;
            lotes.push(Lote::restore(id, &name, active, parse_timestamp(&created)?)?);
        }
        Ok(lotes)
    }
}

impl BoletoStore for SqliteStore {
    fn list_active(&self, filter: &BoletoFilter) -> Result<Vec<Boleto>> {
        let mut sql = String::from(
            "SELECT id, nome_sacado, id_lote, valor, linha_digitavel, ativo, criado_em
             FROM boletos WHERE ativo = 1",
        );
        let mut values: Vec<Value> = Vec::new();

        if let Some(name) = &filter.payer_name {
            sql.push_str(" AND LOWER(nome_sacado) LIKE '%' || LOWER(?) || '%'");
            values.push(Value::Text(name.clone()));
        }
        if let Some(lote_id) = filter.lote_id {
            sql.push_str(" AND id_lote = ?");
            values.push(Value::Integer(lote_id));
        }
        if let Some(min) = filter.min_amount {
            sql.push_str(" AND valor >= ?");
            values.push(Value::Real(min));
        }
        if let Some(max) = filter.max_amount {
            sql.push_str(" AND valor <= ?");
            values.push(Value::Real(max));
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })?;

        let mut boletos = Vec::new();
        for row in rows {
            boletos.push(restore_boleto(row?)?);
        }
        Ok(boletos)
    }

    fn save(&self, boleto: &Boleto) -> Result<Boleto> {
        let created = boleto.created_at().to_rfc3339();

        match boleto.id() {
            Some(id) => {
                self.conn.execute(
                    "UPDATE boletos
                     SET nome_sacado = ?1, id_lote = ?2, valor = ?3,
                         linha_digitavel = ?4, ativo = ?5, criado_em = ?6
                     WHERE id = ?7",
                    params![
                        boleto.payer_name(),
                        boleto.lote_id(),
                        boleto.amount(),
                        boleto.digit_line(),
                        boleto.is_active(),
                        created,
                        id
                    ],
                )?;
                Ok(boleto.clone())
            }
            None => {
                self.conn.execute(
                    "INSERT INTO boletos
                         (nome_sacado, id_lote, valor, linha_digitavel, ativo, criado_em)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        boleto.payer_name(),
                        boleto.lote_id(),
                        boleto.amount(),
                        boleto.digit_line(),
                        boleto.is_active(),
                        created
                    ],
                )?;
                Ok(boleto.clone().with_id(self.conn.last_insert_rowid()))
            }
        }
    }

    fn save_many(&self, boletos: &[Boleto]) -> Result<Vec<Boleto>> {
        let tx = self.conn.unchecked_transaction()?;

        let mut saved = Vec::with_capacity(boletos.len());
        let mut conflicts = Vec::new();

        for boleto in boletos {
            // Sees rows inserted earlier in this same transaction, so two
            // batch entries sharing a lote conflict with each other too.
            let active_for_lote: i64 = tx.query_row(
                "SELECT COUNT(*) FROM boletos WHERE id_lote = ?1 AND ativo = 1",
                params![boleto.lote_id()],
                |row| row.get(0),
            )?;

            if active_for_lote > 0 {
                conflicts.push(format!(
                    "an active boleto already exists for lote {}",
                    boleto.lote_id()
                ));
                continue;
            }

            tx.execute(
                "INSERT INTO boletos
                     (nome_sacado, id_lote, valor, linha_digitavel, ativo, criado_em)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    boleto.payer_name(),
                    boleto.lote_id(),
                    boleto.amount(),
                    boleto.digit_line(),
                    boleto.is_active(),
                    boleto.created_at().to_rfc3339()
                ],
            )?;
            saved.push(boleto.clone().with_id(tx.last_insert_rowid()));
        }

        if !conflicts.is_empty() {
            tx.rollback()?;
            warn!(conflicts = conflicts.len(), "bulk save rolled back");
            return Err(Error::Conflict(conflicts));
        }

        tx.commit()?;
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_lotes(names: &[&str]) -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        for name in names {
            store.insert_lote(&Lote::new(name).unwrap()).unwrap();
        }
        store
    }

    fn boleto(name: &str, lote: i64, amount: f64) -> Boleto {
        Boleto::new(name, lote, amount, "123456123456123456").unwrap()
    }

    #[test]
    fn test_insert_lote_stores_canonical_name() {
        let store = SqliteStore::in_memory().unwrap();
        let lote = store.insert_lote(&Lote::new("17").unwrap()).unwrap();

        assert_eq!(lote.name(), "0017");
        assert!(lote.id().is_some());
    }

    #[test]
    fn test_insert_lote_honors_explicit_id() {
        let store = SqliteStore::in_memory().unwrap();
        let lote = store
            .insert_lote(&Lote::new("17").unwrap().with_id(42))
            .unwrap();
        assert_eq!(lote.id(), Some(42));
    }

    #[test]
    fn test_find_by_names_is_case_insensitive() {
        let store = store_with_lotes(&["00ab", "0018"]);

        let found = store
            .find_by_names(&["00AB".to_string(), "9999".to_string()])
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "00ab");
    }

    #[test]
    fn test_find_by_names_empty_set_skips_query() {
        let store = store_with_lotes(&["0017"]);
        assert!(store.find_by_names(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_save_assigns_id_and_round_trips() {
        let store = store_with_lotes(&["0017"]);
        let saved = store.save(&boleto("JOSE DA SILVA", 1, 182.54)).unwrap();

        let id = saved.id().expect("insert must assign an id");
        let listed = store.list_active(&BoletoFilter::default()).unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id(), Some(id));
        assert_eq!(listed[0].payer_name(), "JOSE DA SILVA");
        assert_eq!(listed[0].amount(), 182.54);
    }

    #[test]
    fn test_save_with_id_updates_in_place() {
        let store = store_with_lotes(&["0017", "0018"]);
        let saved = store.save(&boleto("JOSE", 1, 10.0)).unwrap();

        let moved = Boleto::restore(
            saved.id().unwrap(),
            "JOSE",
            2,
            20.0,
            saved.digit_line(),
            true,
            saved.created_at(),
        )
        .unwrap();
        store.save(&moved).unwrap();

        let listed = store.list_active(&BoletoFilter::default()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].lote_id(), 2);
        assert_eq!(listed[0].amount(), 20.0);
    }

    #[test]
    fn test_save_many_assigns_ascending_ids() {
        let store = store_with_lotes(&["0017", "0018", "0019"]);
        let saved = store
            .save_many(&[
                boleto("A", 1, 1.0),
                boleto("B", 2, 2.0),
                boleto("C", 3, 3.0),
            ])
            .unwrap();

        let ids: Vec<i64> = saved.iter().filter_map(|b| b.id()).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_save_many_conflict_rolls_everything_back() {
        let store = store_with_lotes(&["0017", "0018"]);
        store.save(&boleto("EXISTING", 2, 5.0)).unwrap();

        let result = store.save_many(&[boleto("A", 1, 1.0), boleto("B", 2, 2.0)]);

        match result {
            Err(Error::Conflict(conflicts)) => {
                assert_eq!(conflicts.len(), 1);
                assert!(conflicts[0].contains("lote 2"));
            }
            other => panic!("expected conflict, got {:?}", other.map(|v| v.len())),
        }

        // All-or-nothing: the non-conflicting row was rolled back too
        let listed = store.list_active(&BoletoFilter::default()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].payer_name(), "EXISTING");
    }

    #[test]
    fn test_save_many_conflicts_within_the_batch() {
        let store = store_with_lotes(&["0017"]);

        let result = store.save_many(&[boleto("A", 1, 1.0), boleto("B", 1, 2.0)]);

        assert!(matches!(result, Err(Error::Conflict(ref c)) if c.len() == 1));
        assert!(store.list_active(&BoletoFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_list_active_applies_filters() {
        let store = store_with_lotes(&["0017", "0018", "0019"]);
        store
            .save_many(&[
                boleto("JOSE DA SILVA", 1, 182.54),
                boleto("MARIA SOUZA", 2, 50.0),
                boleto("MARCOS ROBERTO", 3, 178.20),
            ])
            .unwrap();

        let by_name = store
            .list_active(&BoletoFilter {
                payer_name: Some("jose".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].payer_name(), "JOSE DA SILVA");

        let by_lote = store
            .list_active(&BoletoFilter {
                lote_id: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_lote.len(), 1);

        let by_amount = store
            .list_active(&BoletoFilter {
                min_amount: Some(100.0),
                max_amount: Some(180.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_amount.len(), 1);
        assert_eq!(by_amount[0].payer_name(), "MARCOS ROBERTO");
    }

    #[test]
    fn test_list_active_excludes_inactive_rows() {
        let store = store_with_lotes(&["0017"]);
        let saved = store.save(&boleto("JOSE", 1, 10.0)).unwrap();

        let deactivated = Boleto::restore(
            saved.id().unwrap(),
            saved.payer_name(),
            saved.lote_id(),
            saved.amount(),
            saved.digit_line(),
            false,
            saved.created_at(),
        )
        .unwrap();
        store.save(&deactivated).unwrap();

        assert!(store.list_active(&BoletoFilter::default()).unwrap().is_empty());
    }
}
