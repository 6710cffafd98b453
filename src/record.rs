use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::attrs::{value_text, AttrMap};
use crate::source::{Feature, Geometry};

/// Canonical, derived-once-per-run representation of one parcel.
///
/// Created fresh every run and never mutated afterwards except for the
/// residential flag set by the eligibility filter. The raw geometry is kept
/// only for spatial matching and is stripped from every emitted row.
#[derive(Debug, Clone)]
pub struct LeadRecord {
    pub county: String,
    pub parcel_id: String,
    pub owner_name: String,
    pub owner_type: String,
    pub mailing_address: String,
    pub property_address: String,
    pub acres: f64,
    pub vacant_flag: String,
    pub zoning_label: String,
    pub last_sale_date: String,
    pub years_owned: i64,
    pub residential_zone_match: bool,
    pub source_url: String,
    pub pulled_at_utc: DateTime<Utc>,
    pub data_hash: String,
    pub(crate) geometry: Option<Geometry>,
}

/// Map one raw feature into a lead record.
///
/// Every parse failure degrades to the field's zero-value; filtering, not
/// parsing, decides inclusion.
pub fn build_record(
    feature: &Feature,
    county: &str,
    source_url: &str,
    now: DateTime<Utc>,
) -> LeadRecord {
    let attrs = AttrMap::new(&feature.attributes);

    let last_sale_date = to_iso_date(attrs.get(&["dateofsale", "sale_date", "deed_date"]));
    let years_owned = years_owned(&last_sale_date, now.date_naive());

    let mailing_address = line_join(&[
        attrs.get_str(&["ownstreetn"]),
        attrs.get_str(&["owncity"]),
        attrs.get_str(&["ownstate"]),
        attrs.get_str(&["ownzip"]),
    ]);
    let property_address = line_join(&[
        attrs.get_str(&["houseno"]),
        attrs.get_str(&["predirect"]),
        attrs.get_str(&["stname"]),
        attrs.get_str(&["stsufix"]),
        attrs.get_str(&["municode"]),
        attrs.get_str(&["zipcode"]),
    ]);

    let mut record = LeadRecord {
        county: county.to_string(),
        parcel_id: attrs.get_str(&["taxpid", "pid", "parcel_id", "nc_pin"]),
        owner_name: build_owner_name(&attrs),
        owner_type: attrs.get_str(&["ownertype"]),
        mailing_address,
        property_address,
        acres: attrs.get_f64(&["totalac", "acres", "land_acres"]).unwrap_or(0.0),
        vacant_flag: attrs.get_str(&["vacantorimproved", "vacant_flag"]),
        zoning_label: attrs.get_str(&["descpropertyuse", "propertyuse", "zoning", "zone"]),
        last_sale_date,
        years_owned,
        residential_zone_match: false,
        source_url: source_url.to_string(),
        pulled_at_utc: now,
        data_hash: String::new(),
        geometry: feature.geometry.clone(),
    };
    record.data_hash = row_hash(&record);
    record
}

/// Owner name: prefer a combined field, else assemble name parts and append
/// the co-owner last name with " / ".
fn build_owner_name(attrs: &AttrMap) -> String {
    let combined = attrs.get_str(&["owner_name"]);
    if !combined.is_empty() {
        return combined;
    }
    let mut owner = line_join(&[
        attrs.get_str(&["ownfirstn"]),
        attrs.get_str(&["ownmidin"]),
        attrs.get_str(&["ownlastn"]),
    ]);
    let co_owner = attrs.get_str(&["coownlastn"]);
    if !co_owner.is_empty() {
        owner = if owner.is_empty() { co_owner } else { format!("{owner} / {co_owner}") };
    }
    owner
}

/// Join non-empty parts with single spaces.
fn line_join(parts: &[String]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize an upstream date value to an ISO calendar date, or "".
///
/// Feature services deliver dates as epoch milliseconds; anything above ten
/// million is treated as such. String values are accepted in ISO date,
/// ISO datetime, or RFC 3339 form. Everything else degrades to "".
pub(crate) fn to_iso_date(value: Option<&Value>) -> String {
    let Some(value) = value else { return String::new() };
    if let Some(n) = value.as_f64() {
        if n > 10_000_000.0 {
            return DateTime::from_timestamp_millis(n as i64)
                .map(|dt| dt.date_naive().to_string())
                .unwrap_or_default();
        }
    }
    let text = value_text(value);
    if text.is_empty() {
        return String::new();
    }
    parse_iso_date(&text).map(|d| d.to_string()).unwrap_or_default()
}

fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(datetime.date());
    }
    DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive())
}

/// Calendar-aware full years between the sale date and `today`, floor 0.
pub(crate) fn years_owned(date_iso: &str, today: NaiveDate) -> i64 {
    let Ok(owned) = NaiveDate::parse_from_str(date_iso, "%Y-%m-%d") else { return 0 };
    let mut years = i64::from(today.year() - owned.year());
    if (today.month(), today.day()) < (owned.month(), owned.day()) {
        years -= 1;
    }
    years.max(0)
}

/// Content fingerprint: SHA-256 over the pipe-joined identity-relevant
/// fields, in fixed order. Timestamps, the residential flag, and geometry
/// are deliberately excluded.
pub(crate) fn row_hash(record: &LeadRecord) -> String {
    let payload = [
        record.parcel_id.clone(),
        record.owner_name.clone(),
        record.mailing_address.clone(),
        record.property_address.clone(),
        record.acres.to_string(),
        record.vacant_flag.clone(),
        record.zoning_label.clone(),
        record.last_sale_date.clone(),
        record.years_owned.to_string(),
    ]
    .join("|");
    hex::encode(Sha256::digest(payload.as_bytes()))
}
