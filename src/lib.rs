#![doc = "Landlead public API"]
mod attrs;
mod config;
mod filter;
mod geom;
mod pipeline;
mod recon;
mod record;
mod source;
mod store;
mod zoning;

#[doc(inline)]
pub use config::{Config, DEFAULT_ZONE_REGEX};

#[doc(inline)]
pub use pipeline::{collect_leads, run_pipeline, RunSummary};

#[doc(inline)]
pub use record::LeadRecord;

#[doc(inline)]
pub use recon::{reconcile, ReconciledRow, RecordStatus, RunCounts, StoredRow, DEFAULT_VA_STATUS};

#[doc(inline)]
pub use source::{ArcGisSource, Feature, FeatureSource, Geometry};

#[doc(inline)]
pub use store::{row_values, CsvStore, LeadStore, MemStore, RunLogEntry, MASTER_HEADER};

#[doc(inline)]
pub use zoning::{build_residential_index, is_residential_zone, matches_residential, ZoningIndex};

#[doc(inline)]
pub use geom::{centroid_of_rings, rings_to_polygons};

#[doc(inline)]
pub use filter::EligibilityFilter;
