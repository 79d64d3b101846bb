//! Fetching resource collections from the remote catalog
//!
//! Only the first page of each collection is read. The result of a fetch is a
//! `CatalogSnapshot`, an immutable value handed on to shaping; a snapshot can
//! also be saved to disk and served back as a catalog for repeatable runs.

use crate::shape::Record;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// One page of a collection listing
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    pub results: Vec<Record>,
}

/// A source of resource collections
pub trait Catalog {
    /// Fetch the first page of records of a named collection
    fn fetch_page(&self, resource: &str) -> Result<Vec<Record>>;
}

/// The remote REST catalog, read with a blocking HTTP client
pub struct HttpCatalog {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("holocron/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(HttpCatalog {
            client,
            base_url: normalize_base_url(base_url),
        })
    }

    /// `<base>/<resource>/`
    pub fn collection_url(&self, resource: &str) -> String {
        format!("{}{}/", self.base_url, resource)
    }
}

impl Catalog for HttpCatalog {
    fn fetch_page(&self, resource: &str) -> Result<Vec<Record>> {
        let url = self.collection_url(resource);
        debug!(%url, "GET");

        let page: Page = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Catalog refused {}", url))?
            .json()
            .with_context(|| format!("Failed to decode page from {}", url))?;

        if let Some(next) = &page.next {
            debug!(resource, next = %next, total = ?page.count, "skipping further pages");
        }

        Ok(page.results)
    }
}

/// Ensure the base URL ends with exactly one `/`
pub fn normalize_base_url(base_url: &str) -> String {
    format!("{}/", base_url.trim_end_matches('/'))
}

/// Immutable result of fetching every collection a run needs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    collections: BTreeMap<String, Vec<Record>>,
}

impl CatalogSnapshot {
    pub fn new(collections: BTreeMap<String, Vec<Record>>) -> Self {
        CatalogSnapshot { collections }
    }

    pub fn with_collection(mut self, resource: &str, records: Vec<Record>) -> Self {
        self.collections.insert(resource.to_string(), records);
        self
    }

    pub fn records(&self, resource: &str) -> Option<&[Record]> {
        self.collections.get(resource).map(Vec::as_slice)
    }

    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open snapshot {}", path.display()))?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create snapshot {}", path.display()))?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        writer.flush().context("Failed to flush snapshot")
    }
}

// A saved snapshot can stand in for the remote catalog
impl Catalog for CatalogSnapshot {
    fn fetch_page(&self, resource: &str) -> Result<Vec<Record>> {
        self.records(resource)
            .map(<[Record]>::to_vec)
            .ok_or_else(|| anyhow!("Snapshot has no {:?} collection", resource))
    }
}

/// Fetch each collection in turn, one after another
pub fn fetch_all<C: Catalog + ?Sized>(catalog: &C, resources: &[String]) -> Result<CatalogSnapshot> {
    let mut collections = BTreeMap::new();

    for resource in resources {
        let records = catalog
            .fetch_page(resource)
            .with_context(|| format!("Failed to fetch {}", resource))?;
        info!(resource = %resource, records = records.len(), "fetched");
        collections.insert(resource.clone(), records);
    }

    Ok(CatalogSnapshot::new(collections))
}
