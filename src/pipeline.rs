//! The batch job: fetch, shape, load
//!
//! Strictly sequential. Each stage hands an immutable value to the next and
//! any error aborts the run.

use crate::catalog::{fetch_all, Catalog, CatalogSnapshot};
use crate::load::{LoadReport, Session};
use crate::shape::{flatten, CatalogPlan, EntityShaper, ShapedCatalog};
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tracing::info;

/// Shape every collection of a snapshot into tables, in load order
pub fn shape_catalog(plan: &CatalogPlan, snapshot: &CatalogSnapshot) -> Result<ShapedCatalog> {
    plan.validate()?;

    let records = |resource: &str| {
        snapshot
            .records(resource)
            .ok_or_else(|| anyhow!("Snapshot has no {:?} collection", resource))
    };

    let shaper = EntityShaper::new();
    let mut shaped = ShapedCatalog::default();

    for entity in &plan.entities {
        let table = shaper.shape(entity, records(entity.resource.as_str())?)?;
        info!(table = %table.name, rows = table.len(), "shaped");
        shaped.tables.push(table);
    }

    for link in &plan.links {
        let table = flatten(link, records(link.resource.as_str())?)?;
        info!(table = %table.name, rows = table.len(), "flattened");
        shaped.tables.push(table);
    }

    Ok(shaped)
}

/// Recreate the schema and load a shaped catalog through one session
pub fn load_into(session: &mut Session, plan: &CatalogPlan, shaped: &ShapedCatalog) -> Result<LoadReport> {
    session.recreate_schema(plan)?;
    session.load(shaped)
}

/// Fetch from `catalog`, shape, and load into the database at `database`
pub fn run<C: Catalog + ?Sized>(plan: &CatalogPlan, catalog: &C, database: &Path) -> Result<LoadReport> {
    let snapshot = fetch_all(catalog, &plan.resources())?;
    run_snapshot(plan, &snapshot, database)
}

/// Shape and load an already fetched snapshot
pub fn run_snapshot(plan: &CatalogPlan, snapshot: &CatalogSnapshot, database: &Path) -> Result<LoadReport> {
    let shaped = shape_catalog(plan, snapshot)?;

    // Dropped (and so closed) on the error path too
    let mut session = Session::open(database)?;
    let report = load_into(&mut session, plan, &shaped)
        .with_context(|| format!("Failed to load {}", database.display()))?;
    session.close()?;

    info!(%report, total = report.total_rows(), "load complete");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Cell, Record};
    use rusqlite::Connection;
    use serde_json::{json, Value};

    fn records(value: Value) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    fn luke_snapshot() -> CatalogSnapshot {
        CatalogSnapshot::default()
            .with_collection(
                "people",
                records(json!([{
                    "url": "https://swapi.dev/api/people/1/",
                    "name": "Luke",
                    "gender": "male",
                    "homeworld": "https://swapi.dev/api/planets/1/",
                    "films": ["https://swapi.dev/api/films/1/", "https://swapi.dev/api/films/2/"]
                }])),
            )
            .with_collection(
                "planets",
                records(json!([{"url": "https://swapi.dev/api/planets/1/", "name": "Tatooine"}])),
            )
            .with_collection(
                "films",
                records(json!([
                    {"url": "https://swapi.dev/api/films/1/", "title": "A New Hope", "release_date": "1977-05-25"},
                    {"url": "https://swapi.dev/api/films/2/", "title": "The Empire Strikes Back", "release_date": "1980-05-17"}
                ])),
            )
    }

    fn dump(conn: &Connection, sql: &str) -> Vec<Vec<rusqlite::types::Value>> {
        let mut stmt = conn.prepare(sql).unwrap();
        let width = stmt.column_count();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, rusqlite::types::Value>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();
        rows
    }

    fn dump_all(path: &Path) -> Vec<Vec<Vec<rusqlite::types::Value>>> {
        let conn = Connection::open(path).unwrap();
        [
            "SELECT * FROM planets ORDER BY planet_id",
            "SELECT * FROM films ORDER BY film_id",
            "SELECT * FROM people ORDER BY people_id",
            "SELECT * FROM people_films ORDER BY rowid",
        ]
        .iter()
        .map(|sql| dump(&conn, sql))
        .collect()
    }

    #[test]
    fn test_shape_catalog_orders_parents_first() {
        let shaped = shape_catalog(&CatalogPlan::swapi(), &luke_snapshot()).unwrap();
        let names: Vec<_> = shaped.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["planets", "films", "people", "people_films"]);
    }

    #[test]
    fn test_end_to_end_single_person() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("swapi.sqlite");

        let report = run(&CatalogPlan::swapi(), &luke_snapshot(), &db).unwrap();
        assert_eq!(report.rows("planets"), Some(1));
        assert_eq!(report.rows("people"), Some(1));
        assert_eq!(report.rows("films"), Some(2));
        assert_eq!(report.rows("people_films"), Some(2));

        let conn = Connection::open(&db).unwrap();
        let planet: (i64, String) = conn
            .query_row("SELECT planet_id, name FROM planets", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(planet, (1, "Tatooine".to_string()));

        let person: (i64, String, String, i64) = conn
            .query_row("SELECT people_id, name, gender, planet_id FROM people", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
            })
            .unwrap();
        assert_eq!(person, (1, "Luke".to_string(), "male".to_string(), 1));

        let mut stmt = conn
            .prepare("SELECT people_id, film_id FROM people_films ORDER BY rowid")
            .unwrap();
        let pairs: Vec<(i64, i64)> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(pairs, vec![(1, 1), (1, 2)]);

        let release: String = conn
            .query_row("SELECT release_date FROM films WHERE film_id = 2", [], |r| r.get(0))
            .unwrap();
        assert_eq!(release, "1980-05-17");
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("swapi.sqlite");
        let plan = CatalogPlan::swapi();
        let snapshot = luke_snapshot();

        run_snapshot(&plan, &snapshot, &db).unwrap();
        let first = dump_all(&db);
        run_snapshot(&plan, &snapshot, &db).unwrap();
        let second = dump_all(&db);

        assert_eq!(first, second);
        assert_eq!(second[3].len(), 2);
    }

    #[test]
    fn test_dangling_homeworld_aborts_run() {
        let snapshot = luke_snapshot().with_collection("planets", Vec::new());

        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("swapi.sqlite");

        let err = run_snapshot(&CatalogPlan::swapi(), &snapshot, &db).unwrap_err();
        assert!(format!("{err:#}").contains("into people"));

        // Parents committed before the failure stay; the failing table is empty
        let conn = Connection::open(&db).unwrap();
        let films: i64 = conn.query_row("SELECT COUNT(*) FROM films", [], |r| r.get(0)).unwrap();
        let people: i64 = conn.query_row("SELECT COUNT(*) FROM people", [], |r| r.get(0)).unwrap();
        assert_eq!((films, people), (2, 0));
    }

    #[test]
    fn test_dangling_film_aborts_run() {
        let snapshot = luke_snapshot().with_collection(
            "films",
            records(json!([{"url": "https://swapi.dev/api/films/1/", "title": "A New Hope", "release_date": "1977-05-25"}])),
        );

        let mut session = Session::open_in_memory().unwrap();
        let plan = CatalogPlan::swapi();
        let shaped = shape_catalog(&plan, &snapshot).unwrap();

        let err = load_into(&mut session, &plan, &shaped).unwrap_err();
        assert!(format!("{err:#}").contains("row #1 into people_films"));
        assert_eq!(session.row_count("people_films").unwrap(), 0);
    }

    #[test]
    fn test_malformed_url_aborts_before_touching_database() {
        let snapshot = luke_snapshot().with_collection(
            "planets",
            records(json!([{"url": "https://swapi.dev/api/planets/one/", "name": "Tatooine"}])),
        );

        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("swapi.sqlite");

        assert!(run_snapshot(&CatalogPlan::swapi(), &snapshot, &db).is_err());
        assert!(!db.exists());
    }

    #[test]
    fn test_missing_collection_is_error() {
        let snapshot = CatalogSnapshot::default().with_collection("people", Vec::new());
        let err = shape_catalog(&CatalogPlan::swapi(), &snapshot).unwrap_err();
        assert!(err.to_string().contains("planets"));
    }

    #[test]
    fn test_join_rows_sum_list_lengths() {
        let people: Vec<Value> = (1..=4)
            .map(|id| {
                let films: Vec<String> = (1..id).map(|f| format!("https://x/films/{f}/")).collect();
                json!({"url": format!("https://x/people/{id}/"), "name": "p", "gender": "n/a", "homeworld": null, "films": films})
            })
            .collect();
        let snapshot = CatalogSnapshot::default()
            .with_collection("people", records(Value::Array(people)))
            .with_collection("planets", Vec::new())
            .with_collection("films", Vec::new());

        let shaped = shape_catalog(&CatalogPlan::swapi(), &snapshot).unwrap();
        let joins = shaped.table("people_films").unwrap();
        assert_eq!(joins.len(), 0 + 1 + 2 + 3);
        assert!(shaped
            .table("people")
            .unwrap()
            .column("planet_id")
            .unwrap()
            .iter()
            .all(|c| **c == Cell::Null));
    }
}
