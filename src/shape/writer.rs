use crate::shape::types::{ShapedCatalog, Table};
use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Write;

/// Writes shaped tables as a single newline-delimited JSON stream
pub struct RowWriter<W: Write> {
    writer: W,
}

impl<W: Write> RowWriter<W> {
    pub fn new(writer: W) -> Self {
        RowWriter { writer }
    }

    /// Write one object per row, tagged with its destination table
    pub fn write_table(&mut self, table: &Table) -> Result<()> {
        for row in &table.rows {
            let mut data = table.row_object(row);
            data.insert("_table".to_string(), Value::String(table.name.clone()));

            let json = serde_json::to_string(&data)
                .context("Failed to serialize row")?;
            writeln!(self.writer, "{}", json)
                .context("Failed to write row")?;
        }
        Ok(())
    }

    pub fn write_catalog(&mut self, shaped: &ShapedCatalog) -> Result<()> {
        for table in &shaped.tables {
            self.write_table(table)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }
}
