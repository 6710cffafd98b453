use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use regex::Regex;

/// Default pattern for common single/multi-family residential district codes.
pub const DEFAULT_ZONE_REGEX: &str =
    r"(?i)\b(R-\d+|N1-[A-Z]?|N2-[A-Z]?|N3-[A-Z]?|UR-[A-Z]?|RE-\d+)\b";

const DEFAULT_PARCEL_LAYER_URL: &str =
    "https://gis.charlottenc.gov/arcgis/rest/services/PLN/VacantLand/MapServer/0/query";
const DEFAULT_ZONING_LAYER_URL: &str =
    "https://gis.charlottenc.gov/arcgis/rest/services/PLN/Zoning/MapServer/0/query";

/// Immutable run configuration.
///
/// Read once at process start and passed explicitly to each component; core
/// components never consult the environment themselves.
#[derive(Debug, Clone)]
pub struct Config {
    pub county: String,
    pub parcel_layer_url: String,
    pub zoning_layer_url: String,
    pub min_acres: f64,
    pub max_acres: f64,
    pub min_years_owned: i64,
    pub residential_zone_regex: String,
    /// Upper-cased, whole-word matched against owner name + owner type.
    pub corporate_keywords: Vec<String>,
    pub store_dir: PathBuf,
}

impl Config {
    /// Build the configuration from the environment. Missing or unparseable
    /// numeric settings are fatal here, before any network activity.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            county: env_or("COUNTY_NAME", "Mecklenburg"),
            parcel_layer_url: env_or("GIS_VACANT_LAYER_URL", DEFAULT_PARCEL_LAYER_URL),
            zoning_layer_url: env_or("GIS_ZONING_LAYER_URL", DEFAULT_ZONING_LAYER_URL),
            min_acres: parse_env("MIN_ACRES", "0.1")?,
            max_acres: parse_env("MAX_ACRES", "0.8")?,
            min_years_owned: parse_env("MIN_YEARS_OWNED", "10")?,
            residential_zone_regex: env_or("RESIDENTIAL_ZONE_REGEX", DEFAULT_ZONE_REGEX),
            corporate_keywords: env_or("CORPORATE_KEYWORDS", "")
                .split(',')
                .map(|kw| kw.trim().to_uppercase())
                .filter(|kw| !kw.is_empty())
                .collect(),
            store_dir: PathBuf::from(env_or("LEAD_STORE_DIR", "leads")),
        })
    }

    /// Compile the residential-zone pattern.
    pub fn zone_regex(&self) -> Result<Regex> {
        Regex::new(&self.residential_zone_regex)
            .with_context(|| format!("invalid RESIDENTIAL_ZONE_REGEX: {}", self.residential_zone_regex))
    }

    /// Source URL recorded on every lead (layer URL without the query verb).
    pub fn source_url(&self) -> String {
        self.parcel_layer_url.trim_end_matches("/query").to_string()
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = env_or(key, default);
    raw.parse()
        .with_context(|| format!("{key} must be numeric, got {raw:?}"))
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        county: "Mecklenburg".to_string(),
        parcel_layer_url: DEFAULT_PARCEL_LAYER_URL.to_string(),
        zoning_layer_url: DEFAULT_ZONING_LAYER_URL.to_string(),
        min_acres: 0.1,
        max_acres: 0.8,
        min_years_owned: 10,
        residential_zone_regex: DEFAULT_ZONE_REGEX.to_string(),
        corporate_keywords: vec!["LLC".to_string(), "INC".to_string()],
        store_dir: PathBuf::from("leads"),
    }
}
