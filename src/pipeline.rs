use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::filter::EligibilityFilter;
use crate::recon::{reconcile, RecordStatus, RunCounts};
use crate::record::{build_record, LeadRecord};
use crate::source::FeatureSource;
use crate::store::{LeadStore, RunLogEntry};
use crate::zoning::build_residential_index;

/// Outcome of one batch run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_at_utc: DateTime<Utc>,
    pub total_pulled: usize,
    pub total_filtered: usize,
    pub counts: RunCounts,
    pub queue_rows: usize,
}

impl RunSummary {
    /// Human-readable summary, one fact per line.
    pub fn render(&self) -> String {
        format!(
            "Run time (UTC): {}\n\
             Pulled: {}\n\
             Filtered leads: {}\n\
             New: {}\n\
             Updated: {}\n\
             Unchanged: {}\n\
             Queue rows: {}\n",
            self.run_at_utc.to_rfc3339(),
            self.total_pulled,
            self.total_filtered,
            self.counts.new,
            self.counts.updated,
            self.counts.unchanged,
            self.queue_rows,
        )
    }
}

/// Pull both layers, normalize, and filter. Touches no store; used by the
/// full run and by dry runs.
pub fn collect_leads(
    cfg: &Config,
    source: &dyn FeatureSource,
    run_ts: DateTime<Utc>,
    verbose: u8,
) -> Result<(usize, Vec<LeadRecord>)> {
    let zone_re = cfg.zone_regex()?;

    if verbose > 0 { eprintln!("[pull] parcels <- {}", cfg.parcel_layer_url); }
    let parcel_features = source.fetch_layer(&cfg.parcel_layer_url, true)?;
    if verbose > 0 { eprintln!("[pull] {} parcel features", parcel_features.len()); }

    if verbose > 0 { eprintln!("[pull] zoning <- {}", cfg.zoning_layer_url); }
    let zoning_features = source.fetch_layer(&cfg.zoning_layer_url, true)?;
    if verbose > 0 { eprintln!("[pull] {} zoning features", zoning_features.len()); }

    let index = build_residential_index(&zoning_features, &zone_re);
    if verbose > 0 {
        match &index {
            Some(index) => eprintln!("[index] {} residential polygons", index.len()),
            None => eprintln!("[index] no residential polygons; using textual fallback"),
        }
    }

    let filter = EligibilityFilter::new(cfg, &zone_re, index.as_ref())?;
    let source_url = cfg.source_url();

    let mut leads = Vec::new();
    for feature in &parcel_features {
        let mut record = build_record(feature, &cfg.county, &source_url, run_ts);
        if filter.admit(&mut record) {
            leads.push(record);
        }
    }
    if verbose > 0 { eprintln!("[filter] {} leads", leads.len()); }

    Ok((parcel_features.len(), leads))
}

/// One complete run: pull, filter, reconcile against the stored snapshot,
/// then replace the master and queue sinks and append the run log.
///
/// All sinks are written only after every record is computed, so a failed
/// run never leaves partially-updated persisted state.
pub fn run_pipeline(
    cfg: &Config,
    source: &dyn FeatureSource,
    store: &mut dyn LeadStore,
    verbose: u8,
) -> Result<RunSummary> {
    let run_ts = Utc::now();
    let (total_pulled, leads) = collect_leads(cfg, source, run_ts, verbose)?;
    let total_filtered = leads.len();

    let prior = store.load_snapshot()?;
    let (rows, counts) = reconcile(leads, &prior, run_ts);
    if verbose > 0 {
        eprintln!(
            "[recon] new={} updated={} unchanged={}",
            counts.new, counts.updated, counts.unchanged
        );
    }

    let queue: Vec<_> = rows
        .iter()
        .filter(|row| matches!(row.status, RecordStatus::New | RecordStatus::Updated))
        .cloned()
        .collect();

    store.replace_master(&rows)?;
    store.replace_queue(&queue)?;
    store.append_run_log(&RunLogEntry {
        run_at_utc: run_ts,
        total_pulled,
        total_filtered,
        counts,
    })?;

    Ok(RunSummary {
        run_at_utc: run_ts,
        total_pulled,
        total_filtered,
        counts,
        queue_rows: queue.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::source::Feature;
    use crate::store::MemStore;
    use serde_json::json;

    /// Canned two-layer source: parcels for the vacant-land URL, zoning for
    /// the other.
    struct StubSource {
        parcels: Vec<Feature>,
        zoning: Vec<Feature>,
    }

    impl FeatureSource for StubSource {
        fn fetch_layer(&self, url: &str, _return_geometry: bool) -> Result<Vec<Feature>> {
            if url.contains("VacantLand") {
                Ok(self.parcels.clone())
            } else {
                Ok(self.zoning.clone())
            }
        }
    }

    fn parcel(taxpid: &str, acres: f64) -> Feature {
        serde_json::from_value(json!({
            "attributes": {
                "taxpid": taxpid,
                "owner_name": "JANE DOE",
                "totalac": acres,
                "dateofsale": "2010-03-01",
                "vacantorimproved": "VACANT LAND",
                "zoning": "B-1"
            },
            "geometry": {"rings": [[
                [4.0, 4.0], [6.0, 4.0], [6.0, 6.0], [4.0, 6.0], [4.0, 4.0]
            ]]}
        }))
        .unwrap()
    }

    fn residential_zoning() -> Vec<Feature> {
        vec![serde_json::from_value(json!({
            "attributes": {"zonedes": "R-3"},
            "geometry": {"rings": [[
                [0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]
            ]]}
        }))
        .unwrap()]
    }

    #[test]
    fn end_to_end_keeps_centroid_match_and_drops_oversized_parcel() {
        let cfg = test_config();
        let source = StubSource {
            parcels: vec![parcel("KEEP", 0.4), parcel("TOO-BIG", 2.0)],
            zoning: residential_zoning(),
        };
        let mut store = MemStore::default();

        let summary = run_pipeline(&cfg, &source, &mut store, 0).unwrap();
        assert_eq!(summary.total_pulled, 2);
        assert_eq!(summary.total_filtered, 1);
        assert_eq!(summary.counts.new, 1);
        assert_eq!(summary.queue_rows, 1);

        assert_eq!(store.master.len(), 1);
        let row = &store.master[0];
        assert_eq!(row[1], "KEEP");
        assert_eq!(row[9], "yes"); // residential_zone_match via spatial query
        assert_eq!(row[15], "new");
    }

    #[test]
    fn second_identical_run_is_all_unchanged_and_empty_queue() {
        let cfg = test_config();
        let source = StubSource {
            parcels: vec![parcel("A", 0.4), parcel("B", 0.5)],
            zoning: residential_zoning(),
        };
        let mut store = MemStore::default();

        let first = run_pipeline(&cfg, &source, &mut store, 0).unwrap();
        assert_eq!(first.counts.new, 2);

        let second = run_pipeline(&cfg, &source, &mut store, 0).unwrap();
        assert_eq!(second.counts, RunCounts { new: 0, updated: 0, unchanged: 2 });
        assert_eq!(second.queue_rows, 0);
        assert!(store.queue.is_empty());
        assert_eq!(store.run_log.len(), 2);
    }

    #[test]
    fn workflow_fields_survive_an_updated_record() {
        let cfg = test_config();
        let source = StubSource {
            parcels: vec![parcel("A", 0.4)],
            zoning: residential_zoning(),
        };
        let mut store = MemStore::default();
        run_pipeline(&cfg, &source, &mut store, 0).unwrap();

        // Human edits the workflow fields between runs.
        store.snapshot[0].va_status = "Mailed".to_string();
        store.snapshot[0].notes = "left voicemail".to_string();

        // Upstream data changes, so the record is updated but the edits stay.
        let source = StubSource {
            parcels: vec![parcel("A", 0.5)],
            zoning: residential_zoning(),
        };
        let summary = run_pipeline(&cfg, &source, &mut store, 0).unwrap();
        assert_eq!(summary.counts.updated, 1);
        assert_eq!(store.master[0][17], "Mailed");
        assert_eq!(store.master[0][18], "left voicemail");
    }

    #[test]
    fn no_residential_zoning_falls_back_to_parcel_label() {
        let cfg = test_config();
        // Parcel label is residential, zoning layer has nothing residential.
        let mut parcels = vec![parcel("A", 0.4)];
        parcels[0].attributes.insert("zoning".to_string(), json!("R-3"));
        let source = StubSource { parcels, zoning: Vec::new() };
        let mut store = MemStore::default();

        let summary = run_pipeline(&cfg, &source, &mut store, 0).unwrap();
        assert_eq!(summary.total_filtered, 1);
    }
}
