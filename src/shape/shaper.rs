//! Plan-driven entity shaping
//!
//! Turns raw catalog records into typed rows: one row per record, the
//! record's own id derived from its `url`, and reference attributes
//! rewritten into foreign-key ids. No decisions are made at runtime beyond
//! what the `EntityPlan` declares.

use crate::shape::ident::{self, IdentifierError};
use crate::shape::plan::{ColumnKind, EntityPlan, FieldRule};
use crate::shape::types::{Cell, Record, Row, Table};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("record has no string `url` field")]
    MissingUrl,
    #[error("field {field:?} should be {expected}, got {found}")]
    WrongType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("field {field:?} is not a YYYY-MM-DD date: {value:?}")]
    InvalidDate { field: String, value: String },
    #[error("field {field:?} points into {found:?}, expected {expected:?}")]
    WrongTarget {
        field: String,
        expected: String,
        found: String,
    },
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Resolve a reference URL, checking it points into the expected collection
pub(crate) fn resolve_reference(field: &str, url: &str, target: &str) -> Result<i64, ShapeError> {
    let reference = ident::parse_ref(url)?;
    if reference.resource != target {
        return Err(ShapeError::WrongTarget {
            field: field.to_string(),
            expected: target.to_string(),
            found: reference.resource,
        });
    }
    Ok(reference.id)
}

/// Id of the record itself, taken from its canonical `url`
pub(crate) fn record_id(record: &Record, resource: &str) -> Result<i64, ShapeError> {
    match record.get("url") {
        Some(Value::String(url)) => resolve_reference("url", url, resource),
        _ => Err(ShapeError::MissingUrl),
    }
}

/// Shapes raw records according to an entity plan
#[derive(Debug, Default, Clone, Copy)]
pub struct EntityShaper;

impl EntityShaper {
    pub fn new() -> Self {
        EntityShaper
    }

    /// Shape every record into a row of `plan.table`, preserving record order
    pub fn shape(&self, plan: &EntityPlan, records: &[Record]) -> Result<Table> {
        let mut table = Table::new(plan.table.clone(), plan.columns());
        table.rows.reserve(records.len());

        for (idx, record) in records.iter().enumerate() {
            let row = self
                .shape_record(plan, record)
                .with_context(|| format!("Failed to shape {} record #{}", plan.resource, idx))?;
            table.rows.push(row);
        }

        Ok(table)
    }

    /// Shape a single record (no runtime decisions beyond the plan)
    pub fn shape_record(&self, plan: &EntityPlan, record: &Record) -> Result<Row, ShapeError> {
        let mut row = Vec::with_capacity(plan.fields.len() + 2);

        row.push(Cell::Integer(record_id(record, &plan.resource)?));
        if plan.keep_url {
            // record_id already proved this is a string
            let url = record.get("url").and_then(Value::as_str).unwrap_or_default();
            row.push(Cell::Text(url.to_string()));
        }

        for rule in &plan.fields {
            let value = record.get(rule.field()).unwrap_or(&Value::Null);
            let cell = match rule {
                FieldRule::Attribute { field, kind, .. } => Self::attribute_cell(field, *kind, value)?,
                FieldRule::Reference { field, target, .. } => Self::reference_cell(field, target, value)?,
            };
            row.push(cell);
        }

        Ok(row)
    }

    fn attribute_cell(field: &str, kind: ColumnKind, value: &Value) -> Result<Cell, ShapeError> {
        let wrong_type = |expected| ShapeError::WrongType {
            field: field.to_string(),
            expected,
            found: json_type_name(value),
        };

        let cell = match (kind, value) {
            (_, Value::Null) => Cell::Null,

            (ColumnKind::Text, Value::String(s)) => Cell::Text(s.clone()),
            (ColumnKind::Text, Value::Number(n)) => Cell::Text(n.to_string()),
            (ColumnKind::Text, Value::Bool(b)) => Cell::Text(b.to_string()),
            (ColumnKind::Text, _) => return Err(wrong_type("a scalar")),

            (ColumnKind::Integer, Value::Number(n)) => {
                Cell::Integer(n.as_i64().ok_or_else(|| wrong_type("an integer"))?)
            }
            // The catalog serves counts as strings, with placeholders for unknowns
            (ColumnKind::Integer, Value::String(s)) => {
                let s = s.trim();
                match s.replace(',', "").parse::<i64>() {
                    Ok(n) => Cell::Integer(n),
                    Err(_) if matches!(s, "unknown" | "n/a" | "none" | "") => Cell::Null,
                    Err(_) => return Err(wrong_type("an integer")),
                }
            }
            (ColumnKind::Integer, _) => return Err(wrong_type("an integer")),

            (ColumnKind::Date, Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Cell::Date)
                .map_err(|_| ShapeError::InvalidDate {
                    field: field.to_string(),
                    value: s.clone(),
                })?,
            (ColumnKind::Date, _) => return Err(wrong_type("a date string")),
        };

        Ok(cell)
    }

    fn reference_cell(field: &str, target: &str, value: &Value) -> Result<Cell, ShapeError> {
        match value {
            // Unknown reference: a null foreign key, not an error
            Value::Null => Ok(Cell::Null),
            Value::String(url) => resolve_reference(field, url, target).map(Cell::Integer),
            other => Err(ShapeError::WrongType {
                field: field.to_string(),
                expected: "a resource url",
                found: json_type_name(other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::plan::CatalogPlan;
    use serde_json::json;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    fn people_plan() -> EntityPlan {
        CatalogPlan::swapi().entity_for("people").unwrap().clone()
    }

    #[test]
    fn test_shape_person() {
        let luke = record(json!({
            "name": "Luke Skywalker",
            "height": "172",
            "gender": "male",
            "homeworld": "https://swapi.dev/api/planets/1/",
            "films": ["https://swapi.dev/api/films/1/"],
            "url": "https://swapi.dev/api/people/1/"
        }));

        let table = EntityShaper::new().shape(&people_plan(), &[luke]).unwrap();

        assert_eq!(table.name, "people");
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.rows[0],
            vec![
                Cell::Integer(1),
                Cell::Text("https://swapi.dev/api/people/1/".to_string()),
                Cell::Text("Luke Skywalker".to_string()),
                Cell::Text("male".to_string()),
                Cell::Integer(1),
            ]
        );
    }

    #[test]
    fn test_null_or_absent_homeworld_is_null_foreign_key() {
        let records = vec![
            record(json!({"url": "https://swapi.dev/api/people/1/", "name": "A", "gender": "n/a", "homeworld": null})),
            record(json!({"url": "https://swapi.dev/api/people/2/", "name": "B", "gender": "n/a"})),
        ];

        let table = EntityShaper::new().shape(&people_plan(), &records).unwrap();
        let planet_ids = table.column("planet_id").unwrap();
        assert!(planet_ids.iter().all(|c| c.is_null()));
    }

    #[test]
    fn test_row_count_matches_record_count() {
        // Duplicate records stay duplicated; shaping never dedupes
        let records: Vec<Record> = [3, 1, 3, 2]
            .iter()
            .map(|id| {
                record(json!({
                    "url": format!("https://swapi.dev/api/planets/{id}/"),
                    "name": format!("planet {id}")
                }))
            })
            .collect();

        let plan = CatalogPlan::swapi();
        let table = EntityShaper::new()
            .shape(plan.entity_for("planets").unwrap(), &records)
            .unwrap();

        assert_eq!(table.len(), records.len());
        let ids: Vec<_> = table.column("planet_id").unwrap().iter().filter_map(|c| c.as_integer()).collect();
        assert_eq!(ids, vec![3, 1, 3, 2]);
    }

    #[test]
    fn test_film_release_date_parsed() {
        let plan = CatalogPlan::swapi();
        let film = record(json!({
            "title": "A New Hope",
            "release_date": "1977-05-25",
            "url": "https://swapi.dev/api/films/1/"
        }));

        let table = EntityShaper::new()
            .shape(plan.entity_for("films").unwrap(), &[film])
            .unwrap();
        assert_eq!(
            table.rows[0][3],
            Cell::Date(NaiveDate::from_ymd_opt(1977, 5, 25).unwrap())
        );
    }

    #[test]
    fn test_bad_date_is_error() {
        let plan = CatalogPlan::swapi();
        let film = record(json!({
            "title": "A New Hope",
            "release_date": "May 1977",
            "url": "https://swapi.dev/api/films/1/"
        }));

        let err = EntityShaper::new()
            .shape(plan.entity_for("films").unwrap(), &[film])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ShapeError>(),
            Some(ShapeError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_malformed_homeworld_is_parse_error() {
        let person = record(json!({
            "url": "https://swapi.dev/api/people/1/",
            "name": "Luke",
            "gender": "male",
            "homeworld": "https://swapi.dev/api/planets/tatooine"
        }));

        let err = EntityShaper::new().shape(&people_plan(), &[person]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ShapeError>(),
            Some(ShapeError::Identifier(IdentifierError::Malformed { .. }))
        ));
        assert!(format!("{err:#}").contains("people record #0"));
    }

    #[test]
    fn test_reference_into_wrong_collection() {
        let person = record(json!({
            "url": "https://swapi.dev/api/people/1/",
            "name": "Luke",
            "gender": "male",
            "homeworld": "https://swapi.dev/api/starships/9/"
        }));

        let err = EntityShaper::new().shape_record(&people_plan(), &person).unwrap_err();
        assert_eq!(
            err,
            ShapeError::WrongTarget {
                field: "homeworld".to_string(),
                expected: "planets".to_string(),
                found: "starships".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_url_is_error() {
        let person = record(json!({"name": "Luke"}));
        let err = EntityShaper::new().shape_record(&people_plan(), &person).unwrap_err();
        assert_eq!(err, ShapeError::MissingUrl);
    }

    #[test]
    fn test_integer_attribute_placeholders() {
        let plan = EntityPlan::new("people", "people", "people_id")
            .field(FieldRule::attribute("height", ColumnKind::Integer));
        let records = vec![
            record(json!({"url": "https://swapi.dev/api/people/1/", "height": "172"})),
            record(json!({"url": "https://swapi.dev/api/people/2/", "height": "unknown"})),
            record(json!({"url": "https://swapi.dev/api/people/3/", "height": 96})),
        ];

        let table = EntityShaper::new().shape(&plan, &records).unwrap();
        let heights: Vec<_> = table.column("height").unwrap().into_iter().cloned().collect();
        assert_eq!(heights, vec![Cell::Integer(172), Cell::Null, Cell::Integer(96)]);
    }

    #[test]
    fn test_integer_placeholder_with_padding_is_null() {
        let plan = EntityPlan::new("people", "people", "people_id")
            .field(FieldRule::attribute("mass", ColumnKind::Integer));
        let records = vec![
            record(json!({"url": "https://swapi.dev/api/people/1/", "mass": " unknown "})),
            record(json!({"url": "https://swapi.dev/api/people/2/", "mass": " 1,358 "})),
            record(json!({"url": "https://swapi.dev/api/people/3/", "mass": "  "})),
        ];

        let table = EntityShaper::new().shape(&plan, &records).unwrap();
        let masses: Vec<_> = table.column("mass").unwrap().into_iter().cloned().collect();
        assert_eq!(masses, vec![Cell::Null, Cell::Integer(1358), Cell::Null]);
    }
}
