use crate::load::schema;
use crate::load::LoadReport;
use crate::shape::{CatalogPlan, ShapedCatalog, Table};
use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info};

/// The single database session of a run.
///
/// Owns the connection for the whole load; dropping the session closes it,
/// so every exit path releases it. `close` does the same but reports errors.
pub struct Session {
    conn: Connection,
}

impl Session {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        Ok(Session { conn })
    }

    /// Drop every planned table and create it again, committed as one unit
    pub fn recreate_schema(&mut self, plan: &CatalogPlan) -> Result<()> {
        let script = schema::schema_script(plan)?;
        debug!(%script, "recreating schema");

        let tx = self.conn.transaction()?;
        tx.execute_batch(&script).context("Failed to recreate schema")?;
        tx.commit().context("Failed to commit schema")?;

        info!(tables = plan.tables().len(), "schema recreated");
        Ok(())
    }

    /// Insert every row of a table in one transaction.
    ///
    /// Any constraint violation rolls the whole table back and aborts.
    pub fn load_table(&mut self, table: &Table) -> Result<usize> {
        let sql = schema::insert_statement(&table.name, &table.columns);

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx
                .prepare(&sql)
                .with_context(|| format!("Failed to prepare insert into {}", table.name))?;

            for (idx, row) in table.rows.iter().enumerate() {
                if row.len() != table.columns.len() {
                    bail!(
                        "Row #{} of {} has {} values for {} columns",
                        idx,
                        table.name,
                        row.len(),
                        table.columns.len()
                    );
                }
                stmt.execute(rusqlite::params_from_iter(row.iter()))
                    .with_context(|| format!("Failed to insert row #{} into {}", idx, table.name))?;
            }
        }
        tx.commit()
            .with_context(|| format!("Failed to commit {}", table.name))?;

        info!(table = %table.name, rows = table.len(), "loaded");
        Ok(table.len())
    }

    /// Load every shaped table in order, parents before children
    pub fn load(&mut self, shaped: &ShapedCatalog) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        for table in &shaped.tables {
            let rows = self.load_table(table)?;
            report.tables.push((table.name.clone(), rows));
        }
        Ok(report)
    }

    pub fn row_count(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM \"{}\"", table.replace('"', "\"\""));
        self.conn
            .query_row(&sql, [], |row| row.get(0))
            .with_context(|| format!("Failed to count rows of {}", table))
    }

    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, err)| err)
            .context("Failed to close database")
    }
}
