//! Loading shaped tables into the destination database
//!
//! The schema is dropped and recreated on every run, then each table is
//! bulk-inserted in load order so foreign keys always point at rows that
//! are already present.

pub mod schema;
pub mod session;

pub use session::Session;

use std::fmt;

/// Rows written per table, in load order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub tables: Vec<(String, usize)>,
}

impl LoadReport {
    pub fn rows(&self, table: &str) -> Option<usize> {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, rows)| *rows)
    }

    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|(_, rows)| rows).sum()
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .tables
            .iter()
            .map(|(name, rows)| format!("{}={}", name, rows))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}
