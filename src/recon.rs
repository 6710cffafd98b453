use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::record::LeadRecord;

/// Workflow status assigned to leads seen for the first time.
pub const DEFAULT_VA_STATUS: &str = "Ready to Mail";

/// Classification of a lead relative to the prior snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    New,
    Unchanged,
    Updated,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::New => "new",
            RecordStatus::Unchanged => "unchanged",
            RecordStatus::Updated => "updated",
        }
    }
}

/// One row of the prior persisted snapshot, reduced to the fields the
/// reconciliation engine reads.
#[derive(Debug, Clone, Default)]
pub struct StoredRow {
    pub county: String,
    pub parcel_id: String,
    pub data_hash: String,
    pub va_status: String,
    pub notes: String,
}

/// A lead record plus its run classification and carried-forward workflow
/// fields.
#[derive(Debug, Clone)]
pub struct ReconciledRow {
    pub record: LeadRecord,
    pub status: RecordStatus,
    pub last_seen_at_utc: DateTime<Utc>,
    pub va_status: String,
    pub notes: String,
}

impl From<&ReconciledRow> for StoredRow {
    fn from(row: &ReconciledRow) -> Self {
        Self {
            county: row.record.county.clone(),
            parcel_id: row.record.parcel_id.clone(),
            data_hash: row.record.data_hash.clone(),
            va_status: row.va_status.clone(),
            notes: row.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub new: usize,
    pub updated: usize,
    pub unchanged: usize,
}

fn identity_key(county: &str, parcel_id: &str) -> String {
    format!("{}::{}", county.trim(), parcel_id.trim())
}

/// Classify this run's leads against the prior snapshot.
///
/// Prior rows missing either identity field are excluded from the lookup.
/// An existing row with a differing non-empty fingerprint is `updated`; an
/// empty stored fingerprint is treated conservatively as `unchanged`.
/// Workflow fields (va_status, notes) are copied verbatim from the stored
/// row, never regenerated. Output is stably sorted by (status label,
/// parcel id) ascending.
pub fn reconcile(
    leads: Vec<LeadRecord>,
    prior: &[StoredRow],
    run_ts: DateTime<Utc>,
) -> (Vec<ReconciledRow>, RunCounts) {
    let existing: HashMap<String, &StoredRow> = prior
        .iter()
        .filter(|row| !row.county.is_empty() && !row.parcel_id.is_empty())
        .map(|row| (identity_key(&row.county, &row.parcel_id), row))
        .collect();

    let mut counts = RunCounts::default();
    let mut rows = Vec::with_capacity(leads.len());

    for record in leads {
        let key = identity_key(&record.county, &record.parcel_id);
        let (status, va_status, notes) = match existing.get(&key) {
            None => {
                counts.new += 1;
                (RecordStatus::New, DEFAULT_VA_STATUS.to_string(), String::new())
            }
            Some(prev) => {
                let status = if !prev.data_hash.is_empty() && prev.data_hash != record.data_hash {
                    counts.updated += 1;
                    RecordStatus::Updated
                } else {
                    counts.unchanged += 1;
                    RecordStatus::Unchanged
                };
                (status, prev.va_status.clone(), prev.notes.clone())
            }
        };
        rows.push(ReconciledRow { record, status, last_seen_at_utc: run_ts, va_status, notes });
    }

    rows.sort_by(|a, b| {
        (a.status.as_str(), &a.record.parcel_id).cmp(&(b.status.as_str(), &b.record.parcel_id))
    });

    (rows, counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn lead(parcel_id: &str, data_hash: &str) -> LeadRecord {
        LeadRecord {
            county: "Mecklenburg".to_string(),
            parcel_id: parcel_id.to_string(),
            owner_name: "JANE DOE".to_string(),
            owner_type: String::new(),
            mailing_address: String::new(),
            property_address: String::new(),
            acres: 0.4,
            vacant_flag: "VACANT".to_string(),
            zoning_label: "R-3".to_string(),
            last_sale_date: "2013-05-14".to_string(),
            years_owned: 12,
            residential_zone_match: true,
            source_url: "url".to_string(),
            pulled_at_utc: run_ts(),
            data_hash: data_hash.to_string(),
            geometry: None,
        }
    }

    fn stored(parcel_id: &str, data_hash: &str, va_status: &str, notes: &str) -> StoredRow {
        StoredRow {
            county: "Mecklenburg".to_string(),
            parcel_id: parcel_id.to_string(),
            data_hash: data_hash.to_string(),
            va_status: va_status.to_string(),
            notes: notes.to_string(),
        }
    }

    fn run_ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn unseen_lead_is_new_with_default_workflow() {
        let (rows, counts) = reconcile(vec![lead("A", "h1")], &[], run_ts());
        assert_eq!(counts, RunCounts { new: 1, updated: 0, unchanged: 0 });
        assert_eq!(rows[0].status, RecordStatus::New);
        assert_eq!(rows[0].va_status, DEFAULT_VA_STATUS);
        assert_eq!(rows[0].notes, "");
    }

    #[test]
    fn changed_hash_is_updated_and_preserves_workflow() {
        let prior = vec![stored("A", "old", "Mailed", "spoke to owner")];
        let (rows, counts) = reconcile(vec![lead("A", "new")], &prior, run_ts());
        assert_eq!(counts, RunCounts { new: 0, updated: 1, unchanged: 0 });
        assert_eq!(rows[0].status, RecordStatus::Updated);
        assert_eq!(rows[0].va_status, "Mailed");
        assert_eq!(rows[0].notes, "spoke to owner");
    }

    #[test]
    fn same_hash_is_unchanged_and_preserves_workflow() {
        let prior = vec![stored("A", "h1", "Mailed", "")];
        let (rows, counts) = reconcile(vec![lead("A", "h1")], &prior, run_ts());
        assert_eq!(counts, RunCounts { new: 0, updated: 0, unchanged: 1 });
        assert_eq!(rows[0].status, RecordStatus::Unchanged);
        assert_eq!(rows[0].va_status, "Mailed");
    }

    #[test]
    fn empty_stored_hash_is_conservatively_unchanged() {
        let prior = vec![stored("A", "", "Mailed", "legacy row")];
        let (rows, _) = reconcile(vec![lead("A", "h1")], &prior, run_ts());
        assert_eq!(rows[0].status, RecordStatus::Unchanged);
        assert_eq!(rows[0].notes, "legacy row");
    }

    #[test]
    fn orphaned_prior_rows_are_ignored() {
        let prior = vec![
            StoredRow { county: String::new(), ..stored("A", "h1", "Mailed", "") },
            StoredRow { parcel_id: String::new(), ..stored("A", "h1", "Mailed", "") },
        ];
        let (rows, counts) = reconcile(vec![lead("A", "h1")], &prior, run_ts());
        assert_eq!(counts.new, 1);
        assert_eq!(rows[0].status, RecordStatus::New);
    }

    #[test]
    fn rerun_against_own_output_is_all_unchanged() {
        let leads = vec![lead("A", "h1"), lead("B", "h2")];
        let (rows, _) = reconcile(leads.clone(), &[], run_ts());
        let prior: Vec<StoredRow> = rows.iter().map(StoredRow::from).collect();
        let (_, counts) = reconcile(leads, &prior, run_ts());
        assert_eq!(counts, RunCounts { new: 0, updated: 0, unchanged: 2 });
    }

    #[test]
    fn output_sorts_by_status_label_then_parcel_id() {
        let prior = vec![
            stored("B", "same", "Mailed", ""),
            stored("A", "old", "Mailed", ""),
        ];
        let leads = vec![lead("B", "same"), lead("C", "h"), lead("A", "new")];
        let (rows, _) = reconcile(leads, &prior, run_ts());
        let order: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.status.as_str(), r.record.parcel_id.as_str()))
            .collect();
        assert_eq!(order, vec![("new", "C"), ("unchanged", "B"), ("updated", "A")]);
    }
}
