use crate::config::TableConfig;
use crate::model::{ColumnValue, Record};
use crate::storage::schema::{self, quote_ident};
use anyhow::Context;
use rusqlite::types::ToSqlOutput;
use rusqlite::{params_from_iter, Connection, ToSql};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub struct Store {
    pub conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path).context("failed to open sqlite db")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("sqlite connection lock poisoned"))
    }

    pub fn init_schema(&self, tables: &TableConfig) -> anyhow::Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(&schema::ddl(tables))?;
        Ok(())
    }

    /// Inserts every record as one row of `table`, all or nothing.
    pub fn insert_records(&self, table: &str, records: &[Record]) -> anyhow::Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        for (i, record) in records.iter().enumerate() {
            let columns: Vec<String> = record.keys().map(|k| quote_ident(k)).collect();
            let placeholders: Vec<String> = (1..=record.len()).map(|n| format!("?{}", n)).collect();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(table),
                columns.join(", "),
                placeholders.join(", ")
            );

            let mut stmt = tx.prepare_cached(&sql)?;
            stmt.execute(params_from_iter(record.values()))
                .with_context(|| format!("failed to insert record {} into {}", i + 1, table))?;
        }

        tx.commit()?;
        tracing::info!(event = "records_inserted", table = %table, rows = records.len());
        Ok(records.len())
    }

    pub fn count_rows(&self, table: &str) -> anyhow::Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |r| r.get(0),
        )?;
        Ok(count as u64)
    }
}

impl ToSql for ColumnValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            ColumnValue::Int(i) => ToSqlOutput::from(*i),
            ColumnValue::Float(f) => ToSqlOutput::from(*f),
            ColumnValue::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}
