//! # Holocron - catalog-to-database batch loader
//!
//! Fetches the first page of a few resource collections from a REST catalog
//! (swapi.dev by default), reshapes them into a small normalized schema, and
//! loads them into SQLite, replacing the tables on every run.
//!
//! ## Modules
//!
//! - **catalog**: fetch collections into an immutable `CatalogSnapshot`
//! - **shape**: URL ids, per-entity projection, join-table flattening
//! - **load**: drop-and-recreate DDL and per-table bulk inserts
//! - **pipeline**: the whole job, start to finish
//!
//! ## Quick Start
//!
//! ```rust
//! use holocron::{shape_catalog, CatalogPlan, CatalogSnapshot};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let people = serde_json::from_value(json!([{
//!     "url": "https://swapi.dev/api/people/1/",
//!     "name": "Luke Skywalker",
//!     "gender": "male",
//!     "homeworld": "https://swapi.dev/api/planets/1/",
//!     "films": ["https://swapi.dev/api/films/1/"]
//! }]))?;
//!
//! let snapshot = CatalogSnapshot::default()
//!     .with_collection("people", people)
//!     .with_collection("planets", Vec::new())
//!     .with_collection("films", Vec::new());
//!
//! let shaped = shape_catalog(&CatalogPlan::swapi(), &snapshot)?;
//!
//! // people row: (1, url, "Luke Skywalker", "male", 1)
//! // people_films row: (1, 1)
//! assert_eq!(shaped.table("people_films").unwrap().len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod load;
pub mod pipeline;
pub mod settings;
pub mod shape;

// Re-export commonly used types for convenience
pub use catalog::{fetch_all, Catalog, CatalogSnapshot, HttpCatalog};
pub use load::{LoadReport, Session};
pub use pipeline::{load_into, run, run_snapshot, shape_catalog};
pub use settings::Settings;
pub use shape::{extract_id, CatalogPlan, EntityShaper, RowWriter, ShapedCatalog, Table};
