use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

/// One upstream geographic record: attributes plus optional polygon geometry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

/// Raw polygon geometry as delivered by the feature service. Rings are kept
/// as untyped JSON so a malformed coordinate poisons one ring, not the whole
/// response (see `geom::rings_to_polygons`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Geometry {
    #[serde(default)]
    pub rings: Value,
}

#[derive(Deserialize)]
struct QueryPage {
    #[serde(default)]
    features: Vec<Feature>,
    #[serde(default)]
    error: Option<Value>,
}

/// Retrieval of the complete feature set for one layer.
///
/// Implementations must return every feature before processing begins; the
/// pipeline never works from a partial batch.
pub trait FeatureSource {
    fn fetch_layer(&self, url: &str, return_geometry: bool) -> Result<Vec<Feature>>;
}

/// ArcGIS-style feature-query client with offset pagination.
pub struct ArcGisSource {
    client: Client,
    batch_size: usize,
    verbose: u8,
}

impl ArcGisSource {
    pub fn new(verbose: u8) -> Result<Self> {
        let client = Client::builder()
            .user_agent("landlead/0.1 (+https://github.com/landlead/landlead)")
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { client, batch_size: 2000, verbose })
    }
}

impl FeatureSource for ArcGisSource {
    fn fetch_layer(&self, url: &str, return_geometry: bool) -> Result<Vec<Feature>> {
        let mut features = Vec::new();
        let mut offset = 0usize;

        loop {
            let params = [
                ("f", "json".to_string()),
                ("where", "1=1".to_string()),
                ("outFields", "*".to_string()),
                ("returnGeometry", return_geometry.to_string()),
                ("outSR", "2264".to_string()),
                ("resultOffset", offset.to_string()),
                ("resultRecordCount", self.batch_size.to_string()),
            ];

            let response = self
                .client
                .get(url)
                .query(&params)
                .send()
                .with_context(|| format!("GET {url}"))?
                .error_for_status()
                .with_context(|| format!("GET {url} returned error status"))?;

            let page: QueryPage = serde_json::from_reader(response)
                .with_context(|| format!("parse feature page from {url}"))?;

            // Service-level errors arrive inside a 200 response.
            if let Some(error) = page.error {
                bail!("feature service error from {url}: {error}");
            }

            let count = page.features.len();
            features.extend(page.features);
            if self.verbose > 1 {
                eprintln!("[source] {url} offset={offset} batch={count}");
            }
            if count < self.batch_size {
                break;
            }
            offset += self.batch_size;
        }

        Ok(features)
    }
}
