//! Flattening of list-valued references into join rows

use crate::shape::plan::LinkPlan;
use crate::shape::shaper::{json_type_name, record_id, resolve_reference, ShapeError};
use crate::shape::types::{Cell, Record, Table};
use anyhow::{Context, Result};
use serde_json::Value;

/// Expand `link.field` of every record into one (source id, target id) row
/// per list entry.
///
/// Rows come out in record order, then list order within a record. A record
/// with an empty (or absent) list contributes no rows at all, so the table
/// length is exactly the total number of list entries.
pub fn flatten(link: &LinkPlan, records: &[Record]) -> Result<Table> {
    let mut table = Table::new(link.table.clone(), link.columns());

    for (idx, record) in records.iter().enumerate() {
        let pairs = flatten_record(link, record)
            .with_context(|| format!("Failed to flatten {}.{} of record #{}", link.resource, link.field, idx))?;

        table.rows.extend(
            pairs
                .into_iter()
                .map(|(source, target)| vec![Cell::Integer(source), Cell::Integer(target)]),
        );
    }

    Ok(table)
}

/// Pairs contributed by a single record
pub fn flatten_record(link: &LinkPlan, record: &Record) -> Result<Vec<(i64, i64)>, ShapeError> {
    let source = record_id(record, &link.resource)?;

    let entries = match record.get(&link.field) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return Err(ShapeError::WrongType {
                field: link.field.clone(),
                expected: "a list of resource urls",
                found: json_type_name(other),
            })
        }
    };

    entries
        .iter()
        .map(|entry| match entry {
            Value::String(url) => resolve_reference(&link.field, url, &link.target).map(|target| (source, target)),
            other => Err(ShapeError::WrongType {
                field: link.field.clone(),
                expected: "a resource url",
                found: json_type_name(other),
            }),
        })
        .collect()
}
