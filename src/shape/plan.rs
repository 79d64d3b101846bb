//! Declarative shaping plans
//!
//! A `CatalogPlan` says, for each destination table, which catalog collection
//! feeds it, which attributes survive, and which attributes are references
//! to other entities. The shaper and the schema loader are both driven from
//! it, so adding an entity is a matter of adding a plan entry.

use std::collections::HashSet;
use thiserror::Error;

/// SQL-facing type of a plain attribute column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Text,
    /// `YYYY-MM-DD` in the source, a date in the destination
    Date,
}

impl ColumnKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Text => "TEXT",
            ColumnKind::Date => "DATE",
        }
    }
}

/// How one source attribute becomes one destination column
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRule {
    /// Copy the attribute as-is
    Attribute {
        field: String,
        column: String,
        kind: ColumnKind,
    },
    /// Resolve a URL-valued attribute into the id of an entity in `target`
    Reference {
        field: String,
        column: String,
        /// Resource collection the URL must point into, e.g. "planets"
        target: String,
    },
}

impl FieldRule {
    pub fn attribute(field: &str, kind: ColumnKind) -> Self {
        FieldRule::Attribute {
            field: field.to_string(),
            column: field.to_string(),
            kind,
        }
    }

    pub fn reference(field: &str, column: &str, target: &str) -> Self {
        FieldRule::Reference {
            field: field.to_string(),
            column: column.to_string(),
            target: target.to_string(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            FieldRule::Attribute { field, .. } | FieldRule::Reference { field, .. } => field,
        }
    }

    pub fn column(&self) -> &str {
        match self {
            FieldRule::Attribute { column, .. } | FieldRule::Reference { column, .. } => column,
        }
    }
}

/// Shaping plan for one entity table
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPlan {
    /// Destination table, e.g. "people"
    pub table: String,

    /// Source collection, e.g. "people"
    pub resource: String,

    /// Primary key column, filled from the record's own `url`
    pub id_column: String,

    /// Whether to also keep the record's `url` as a column
    pub keep_url: bool,

    pub fields: Vec<FieldRule>,
}

impl EntityPlan {
    pub fn new(table: &str, resource: &str, id_column: &str) -> Self {
        EntityPlan {
            table: table.to_string(),
            resource: resource.to_string(),
            id_column: id_column.to_string(),
            keep_url: true,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, rule: FieldRule) -> Self {
        self.fields.push(rule);
        self
    }

    /// Column names in the order the shaper emits them
    pub fn columns(&self) -> Vec<String> {
        let mut columns = vec![self.id_column.clone()];
        if self.keep_url {
            columns.push("url".to_string());
        }
        columns.extend(self.fields.iter().map(|f| f.column().to_string()));
        columns
    }

    pub fn references(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().filter_map(|f| match f {
            FieldRule::Reference { column, target, .. } => Some((column.as_str(), target.as_str())),
            FieldRule::Attribute { .. } => None,
        })
    }
}

/// Flattening plan for a list-valued reference attribute
#[derive(Debug, Clone, PartialEq)]
pub struct LinkPlan {
    /// Destination join table, e.g. "people_films"
    pub table: String,

    /// Collection whose records carry the list, e.g. "people"
    pub resource: String,

    /// List-valued attribute, e.g. "films"
    pub field: String,

    /// Collection the listed URLs point into, e.g. "films"
    pub target: String,

    pub source_column: String,
    pub target_column: String,
}

impl LinkPlan {
    pub fn columns(&self) -> Vec<String> {
        vec![self.source_column.clone(), self.target_column.clone()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("table {0:?} is declared more than once")]
    DuplicateTable(String),
    #[error("{table}.{column} references {target:?}, which no entity plan covers")]
    UnknownTarget {
        table: String,
        column: String,
        target: String,
    },
    #[error("{table}.{column} references {target:?}, which is loaded after it")]
    ParentAfterChild {
        table: String,
        column: String,
        target: String,
    },
}

/// The full declarative schema map for one catalog
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPlan {
    /// Entity plans in load order; a referenced entity must come first
    pub entities: Vec<EntityPlan>,

    /// Join tables, loaded after every entity table
    pub links: Vec<LinkPlan>,
}

impl CatalogPlan {
    /// Planets, films, people, and the people-to-films join table
    pub fn swapi() -> Self {
        CatalogPlan {
            entities: vec![
                EntityPlan::new("planets", "planets", "planet_id")
                    .field(FieldRule::attribute("name", ColumnKind::Text)),
                EntityPlan::new("films", "films", "film_id")
                    .field(FieldRule::attribute("title", ColumnKind::Text))
                    .field(FieldRule::attribute("release_date", ColumnKind::Date)),
                EntityPlan::new("people", "people", "people_id")
                    .field(FieldRule::attribute("name", ColumnKind::Text))
                    .field(FieldRule::attribute("gender", ColumnKind::Text))
                    .field(FieldRule::reference("homeworld", "planet_id", "planets")),
            ],
            links: vec![LinkPlan {
                table: "people_films".to_string(),
                resource: "people".to_string(),
                field: "films".to_string(),
                target: "films".to_string(),
                source_column: "people_id".to_string(),
                target_column: "film_id".to_string(),
            }],
        }
    }

    /// Collections that need fetching, each listed once, in first-use order
    pub fn resources(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entities
            .iter()
            .map(|e| e.resource.as_str())
            .chain(self.links.iter().map(|l| l.resource.as_str()))
            .filter(|r| seen.insert(*r))
            .map(str::to_string)
            .collect()
    }

    /// The entity plan fed by a given collection
    pub fn entity_for(&self, resource: &str) -> Option<&EntityPlan> {
        self.entities.iter().find(|e| e.resource == resource)
    }

    /// Every table name, in load order
    pub fn tables(&self) -> Vec<&str> {
        self.entities
            .iter()
            .map(|e| e.table.as_str())
            .chain(self.links.iter().map(|l| l.table.as_str()))
            .collect()
    }

    /// Check that every reference resolves to an entity loaded before it
    pub fn validate(&self) -> Result<(), PlanError> {
        let mut seen_tables = HashSet::new();
        for table in self.tables() {
            if !seen_tables.insert(table) {
                return Err(PlanError::DuplicateTable(table.to_string()));
            }
        }

        for (position, entity) in self.entities.iter().enumerate() {
            for (column, target) in entity.references() {
                let parent = self
                    .entities
                    .iter()
                    .position(|e| e.resource == target)
                    .ok_or_else(|| PlanError::UnknownTarget {
                        table: entity.table.clone(),
                        column: column.to_string(),
                        target: target.to_string(),
                    })?;

                if parent >= position {
                    return Err(PlanError::ParentAfterChild {
                        table: entity.table.clone(),
                        column: column.to_string(),
                        target: target.to_string(),
                    });
                }
            }
        }

        for link in &self.links {
            for (column, target) in [
                (&link.source_column, &link.resource),
                (&link.target_column, &link.target),
            ] {
                if self.entity_for(target).is_none() {
                    return Err(PlanError::UnknownTarget {
                        table: link.table.clone(),
                        column: column.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
