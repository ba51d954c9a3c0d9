//! Stand/zone metadata join
//!
//! Places classified flights on the apron map by joining `stand_id` to a
//! stand table. The join is inner: flights on stands missing from the
//! table are not placed. This is the only step that drops records; the
//! pipeline output itself always keeps every row.

use crate::types::{FlightRecord, RawRow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Stand table column names.
pub mod columns {
    pub const STAND_ID: &str = "Stand_ID";
    pub const ZONE: &str = "Zone";
    pub const LAT: &str = "Lat";
    pub const LON: &str = "Lon";
}

/// Location metadata for one stand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandZone {
    pub stand_id: String,
    pub zone: String,
    pub lat: f64,
    pub lon: f64,
}

/// Anything that can resolve a stand id to its metadata.
pub trait StandLookup {
    fn lookup(&self, stand_id: &str) -> Option<&StandZone>;
}

/// In-memory stand table keyed by stand id.
#[derive(Debug, Clone, Default)]
pub struct StandTable {
    stands: HashMap<String, StandZone>,
}

impl StandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw table rows. Rows without an id or with non-numeric
    /// coordinates are skipped; a repeated id keeps the last row.
    pub fn from_rows(rows: &[RawRow]) -> Self {
        let mut table = Self::new();
        let mut skipped = 0usize;

        for (index, row) in rows.iter().enumerate() {
            let parsed = row.text(columns::STAND_ID).and_then(|id| {
                Some(StandZone {
                    stand_id: id.into_owned(),
                    zone: row.text_or_empty(columns::ZONE),
                    lat: row.number(columns::LAT)?,
                    lon: row.number(columns::LON)?,
                })
            });
            match parsed {
                Some(stand) => table.insert(stand),
                None => {
                    skipped += 1;
                    debug!(row = index, "Stand row missing id or coordinates");
                }
            }
        }

        if skipped > 0 {
            warn!(skipped, kept = table.len(), "Skipped incomplete stand rows");
        }
        table
    }

    pub fn insert(&mut self, stand: StandZone) {
        self.stands.insert(stand.stand_id.clone(), stand);
    }

    pub fn len(&self) -> usize {
        self.stands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stands.is_empty()
    }
}

impl StandLookup for StandTable {
    fn lookup(&self, stand_id: &str) -> Option<&StandZone> {
        self.stands.get(stand_id.trim())
    }
}

impl FromIterator<StandZone> for StandTable {
    fn from_iter<I: IntoIterator<Item = StandZone>>(iter: I) -> Self {
        let mut table = Self::new();
        for stand in iter {
            table.insert(stand);
        }
        table
    }
}

/// A classified flight with its stand location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedFlight<'a> {
    pub record: &'a FlightRecord,
    pub stand: &'a StandZone,
}

/// Inner join of records to stands, preserving record order.
pub fn join_stands<'a, L, I>(records: I, lookup: &'a L) -> Vec<PlacedFlight<'a>>
where
    L: StandLookup + ?Sized,
    I: IntoIterator<Item = &'a FlightRecord>,
{
    let mut unmatched = 0usize;
    let placed: Vec<PlacedFlight<'a>> = records
        .into_iter()
        .filter_map(|record| match lookup.lookup(record.stand_id()) {
            Some(stand) => Some(PlacedFlight { record, stand }),
            None => {
                unmatched += 1;
                None
            }
        })
        .collect();
    debug!(placed = placed.len(), unmatched, "Stand join");
    placed
}
