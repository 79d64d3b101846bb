//! DDL rendered from a `CatalogPlan`
//!
//! The destination schema is always rebuilt from scratch: every table is
//! dropped (children first, so no foreign key is left dangling mid-drop)
//! and then created again in load order.

use crate::shape::plan::{CatalogPlan, FieldRule};
use crate::shape::PlanError;

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `REFERENCES <table>(<id column>)` for the entity fed by `resource`
fn references_clause(plan: &CatalogPlan, table: &str, column: &str, resource: &str) -> Result<String, PlanError> {
    let parent = plan.entity_for(resource).ok_or_else(|| PlanError::UnknownTarget {
        table: table.to_string(),
        column: column.to_string(),
        target: resource.to_string(),
    })?;

    Ok(format!(
        "REFERENCES {}({})",
        quote_ident(&parent.table),
        quote_ident(&parent.id_column)
    ))
}

/// `DROP TABLE IF EXISTS` for every table, in reverse load order
pub fn drop_statements(plan: &CatalogPlan) -> Vec<String> {
    plan.tables()
        .into_iter()
        .rev()
        .map(|table| format!("DROP TABLE IF EXISTS {}", quote_ident(table)))
        .collect()
}

/// `CREATE TABLE` for every table, in load order
pub fn create_statements(plan: &CatalogPlan) -> Result<Vec<String>, PlanError> {
    let mut statements = Vec::new();

    for entity in &plan.entities {
        let mut columns = vec![format!("{} INTEGER NOT NULL PRIMARY KEY", quote_ident(&entity.id_column))];
        if entity.keep_url {
            columns.push(format!("{} TEXT", quote_ident("url")));
        }

        for rule in &entity.fields {
            let column = match rule {
                FieldRule::Attribute { column, kind, .. } => {
                    format!("{} {}", quote_ident(column), kind.sql_type())
                }
                // Nullable: the catalog may not know a record's reference
                FieldRule::Reference { column, target, .. } => format!(
                    "{} INTEGER {}",
                    quote_ident(column),
                    references_clause(plan, &entity.table, column, target)?
                ),
            };
            columns.push(column);
        }

        statements.push(format!(
            "CREATE TABLE {} ({})",
            quote_ident(&entity.table),
            columns.join(", ")
        ));
    }

    for link in &plan.links {
        let source = references_clause(plan, &link.table, &link.source_column, &link.resource)?;
        let target = references_clause(plan, &link.table, &link.target_column, &link.target)?;

        statements.push(format!(
            "CREATE TABLE {} ({} INTEGER NOT NULL {}, {} INTEGER NOT NULL {})",
            quote_ident(&link.table),
            quote_ident(&link.source_column),
            source,
            quote_ident(&link.target_column),
            target,
        ));
    }

    Ok(statements)
}

/// The whole drop-and-recreate script
pub fn schema_script(plan: &CatalogPlan) -> Result<String, PlanError> {
    let mut statements = drop_statements(plan);
    statements.extend(create_statements(plan)?);
    Ok(statements.iter().map(|s| format!("{};\n", s)).collect())
}

/// Positional-parameter insert for a table's columns
pub fn insert_statement(table: &str, columns: &[String]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let params: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        params.join(", ")
    )
}
