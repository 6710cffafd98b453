use anyhow::Result;
use regex::Regex;

use crate::config::Config;
use crate::geom::centroid_of_rings;
use crate::record::LeadRecord;
use crate::zoning::{matches_residential, ZoningIndex};

/// Ordered eligibility predicates over one lead record.
///
/// Predicates short-circuit; the cheapest, most certain rejections (missing
/// identity, numeric bounds) run before the spatial query. Corporate keyword
/// patterns are compiled once per run.
pub struct EligibilityFilter<'a> {
    cfg: &'a Config,
    zone_re: &'a Regex,
    keyword_patterns: Vec<Regex>,
    index: Option<&'a ZoningIndex>,
}

impl<'a> EligibilityFilter<'a> {
    pub fn new(cfg: &'a Config, zone_re: &'a Regex, index: Option<&'a ZoningIndex>) -> Result<Self> {
        let keyword_patterns = cfg
            .corporate_keywords
            .iter()
            .filter(|kw| !kw.is_empty())
            .map(|kw| Ok(Regex::new(&format!(r"\b{}\b", regex::escape(kw)))?))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { cfg, zone_re, keyword_patterns, index })
    }

    /// Keep or drop one record. On keep, sets the residential-zone flag.
    pub fn admit(&self, record: &mut LeadRecord) -> bool {
        if record.parcel_id.is_empty() {
            return false;
        }
        if !(self.cfg.min_acres <= record.acres && record.acres <= self.cfg.max_acres) {
            return false;
        }
        if record.years_owned < self.cfg.min_years_owned {
            return false;
        }
        if !self.is_individual_owner(&record.owner_name, &record.owner_type) {
            return false;
        }
        // The parcel layer should already be vacant land; keep this guard.
        let vacant = record.vacant_flag.to_uppercase();
        if !vacant.is_empty() && !vacant.contains("VAC") {
            return false;
        }

        let centroid = record.geometry.as_ref().and_then(|g| centroid_of_rings(&g.rings));
        if !matches_residential(centroid, self.index, &record.zoning_label, self.zone_re) {
            return false;
        }

        record.residential_zone_match = true;
        true
    }

    /// Owner types containing "INDIV" are always individual; otherwise the
    /// owner is individual unless a corporate keyword appears whole-word in
    /// the combined owner-name + owner-type text.
    fn is_individual_owner(&self, owner_name: &str, owner_type: &str) -> bool {
        if owner_type.to_uppercase().contains("INDIV") {
            return true;
        }
        let text = format!("{owner_name} {owner_type}").to_uppercase();
        !self.keyword_patterns.iter().any(|pattern| pattern.is_match(&text))
    }
}
