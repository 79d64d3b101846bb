//! Reshaping catalog records into relational rows
//!
//! This module turns the raw, URL-linked records served by the catalog into
//! flat tables with integer keys:
//!
//! - **ident**: numeric ids from resource URLs
//! - **plan**: the declarative schema map (what to keep, what is a reference)
//! - **shaper**: one typed row per record, references resolved to ids
//! - **flatten**: list-valued references expanded into join rows

pub mod types;
pub mod ident;
pub mod plan;
pub mod shaper;
pub mod flatten;
pub mod writer;

pub use types::{Cell, Record, Row, ShapedCatalog, Table};
pub use ident::{extract_id, parse_ref, IdentifierError, ResourceRef};
pub use plan::{CatalogPlan, ColumnKind, EntityPlan, FieldRule, LinkPlan, PlanError};
pub use shaper::{EntityShaper, ShapeError};
pub use flatten::flatten;
pub use writer::RowWriter;
