use std::collections::BTreeMap;

use serde::Serialize;

use crate::geodesy::haversine;

const STR_PREFIX: &str = "STR;";
const NAME_FIELD: usize = 1;
const COUNTRY_FIELD: usize = 8;
const LAT_FIELD: usize = 9;
const LON_FIELD: usize = 10;

/// A mount point advertised by a caster.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SourceEntry {
    pub name: String,
    /// 3 letter country code.
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

impl SourceEntry {
    /// Parse a `STR;` line, or `None` if it has too few fields or bad coordinates.
    #[must_use]
    pub fn from_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(';').collect();
        if fields.len() <= LON_FIELD {
            return None;
        }
        Some(SourceEntry {
            name: fields[NAME_FIELD].to_string(),
            country: fields[COUNTRY_FIELD].to_string(),
            lat: fields[LAT_FIELD].trim().parse().ok()?,
            lon: fields[LON_FIELD].trim().parse().ok()?,
        })
    }
}

/// Distance from a position to a mount point.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MountDistance {
    pub name: String,
    pub country: String,
    pub km: f64,
}

/// Mount points from a caster source table, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    entries: BTreeMap<String, SourceEntry>,
    lines: Vec<String>,
}

impl SourceTable {
    /// Parse the text of a source table response.
    ///
    /// Only `STR;` lines are used. With a `country` filter a line must also contain
    /// `;<COUNTRY>;`, compared case-insensitively. Lines that cannot be parsed are skipped
    /// and a later entry replaces an earlier one with the same name.
    #[must_use]
    pub fn parse(text: &str, country: Option<&str>) -> Self {
        let filter = country.map(|c| format!(";{};", c.trim().to_uppercase()));
        let mut table = SourceTable::default();
        for line in text.lines().map(str::trim) {
            if !line.starts_with(STR_PREFIX) {
                continue;
            }
            if let Some(filter) = &filter {
                if !line.to_uppercase().contains(filter.as_str()) {
                    continue;
                }
            }
            table.lines.push(line.to_string());
            if let Some(entry) = SourceEntry::from_line(line) {
                table.entries.insert(entry.name.clone(), entry);
            }
        }
        table
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SourceEntry> {
        self.entries.get(name)
    }

    /// Entries ordered by name.
    pub fn entries(&self) -> impl Iterator<Item = &SourceEntry> {
        self.entries.values()
    }

    /// `STR;` lines that passed the filter, in the order received.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Up to `limit` mount points closest to `lat`, `lon`, nearest first.
    ///
    /// Entries without a position, i.e., a zero latitude or longitude, are left out.
    #[must_use]
    pub fn nearest(&self, lat: f64, lon: f64, limit: usize) -> Vec<MountDistance> {
        let mut zult: Vec<MountDistance> = self
            .entries
            .values()
            .filter(|e| e.lat != 0.0 && e.lon != 0.0)
            .map(|e| MountDistance {
                name: e.name.clone(),
                country: e.country.clone(),
                km: haversine(lat, lon, e.lat, e.lon),
            })
            .collect();
        zult.sort_by(|a, b| a.km.total_cmp(&b.km));
        zult.truncate(limit);
        zult
    }
}
