//! Daily hotspot pool: catalog, date-seeded selection, user assignment.
//!
//! All users share one pool per calendar day. The selection and the per-user
//! assignment are pure functions of the date (and user id), so every process
//! replica computes the same pool membership without coordination and
//! restarts do not reshuffle anyone's hotspot.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::{Date, OffsetDateTime};

/// A candidate destination from the fixed catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destination {
    pub place: &'static str,
    pub region: &'static str,
}

const fn dest(place: &'static str, region: &'static str) -> Destination {
    Destination { place, region }
}

/// Curated destinations eligible to be featured as daily hotspots.
pub const CATALOG: &[Destination] = &[
    // Northern mountains and lakes
    dest("Lake Saif-ul-Malook", "Kaghan Valley"),
    dest("Fairy Meadows", "Nanga Parbat"),
    dest("Hunza Valley", "Gilgit-Baltistan"),
    dest("Skardu", "Baltistan"),
    dest("Attabad Lake", "Hunza"),
    dest("Ratti Gali Lake", "Azad Kashmir"),
    dest("Naran", "Kaghan Valley"),
    dest("Shogran", "Kaghan Valley"),
    dest("Kumrat Valley", "Upper Dir"),
    dest("Chitral", "Khyber Pakhtunkhwa"),
    // Culture and history
    dest("Shandur Polo Ground", "Gilgit-Baltistan"),
    dest("Kalash Valley", "Chitral"),
    dest("Takht-e-Bahi", "Mardan"),
    dest("Peshawar Old City", "Khyber Pakhtunkhwa"),
    // Hills and valleys
    dest("Murree", "Punjab"),
    dest("Patriata", "Punjab"),
    dest("Bhurban", "Punjab"),
    dest("Nathia Gali", "Galiyat"),
    dest("Ayubia", "Galiyat"),
    // Deserts and coast
    dest("Hingol National Park", "Balochistan"),
    dest("Gwadar Beach", "Balochistan"),
    dest("Thar Desert", "Sindh"),
    dest("Keenjhar Lake", "Sindh"),
    // Hidden gems
    dest("Deosai Plains", "Gilgit-Baltistan"),
    dest("Khunjerab Pass", "Gilgit-Baltistan"),
    dest("Manthoka Waterfall", "Skardu"),
    dest("Kachura Lakes", "Skardu"),
    dest("Naltar Valley", "Gilgit-Baltistan"),
    dest("Ushu Forest", "Kaghan Valley"),
    // Adventure
    dest("K2 Base Camp", "Baltistan"),
    dest("Concordia", "Baltistan"),
    dest("Rakaposhi Base Camp", "Nagar"),
    dest("Trango Towers", "Baltistan"),
    // Cultural sites
    dest("Badshahi Mosque", "Lahore"),
    dest("Lahore Fort", "Lahore"),
    dest("Mohatta Palace", "Karachi"),
    dest("Quaid-e-Azam Residency", "Ziarat"),
    // Seasonal favorites
    dest("Swat Valley", "Khyber Pakhtunkhwa"),
    dest("Kalam", "Swat"),
    dest("Malam Jabba", "Swat"),
];

/// Content generated for one hotspot of a daily pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub date: Date,
    pub place_name: String,
    pub region: String,
    pub pool_index: usize,
    pub story: String,
    pub highlights: Vec<String>,
    pub best_time_to_visit: String,
    pub travel_tips: String,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
}

/// The shared pool for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPool {
    pub date: Date,
    pub hotspots: Vec<Hotspot>,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
}

/// A user's hotspot for the day, with the assignment metadata clients show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedHotspot {
    pub id: String,
    #[serde(flatten)]
    pub hotspot: Hotspot,
    pub user_index: usize,
    pub pool_size: usize,
}

fn digest_prefix_u64(input: &str) -> u64 {
    let digest = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Selects `count` catalog entries for a date.
///
/// Each entry is ranked by a digest of the date and its catalog position;
/// the lowest-ranked entries win. Same date, same catalog, same selection,
/// on every platform and across restarts.
pub fn select_for_date(date: Date, catalog: &[Destination], count: usize) -> Vec<Destination> {
    let mut ranked: Vec<(u64, usize)> = catalog
        .iter()
        .enumerate()
        .map(|(idx, _)| (digest_prefix_u64(&format!("{date}#{idx}")), idx))
        .collect();
    ranked.sort_unstable();
    ranked
        .into_iter()
        .take(count.min(catalog.len()))
        .map(|(_, idx)| catalog[idx])
        .collect()
}

/// Maps a user to an index into the day's pool.
///
/// Same user and date always yield the same index; distinct users spread
/// approximately uniformly over `[0, pool_size)`.
///
/// # Panics
///
/// Panics if `pool_size` is zero; callers guarantee a non-empty pool.
pub fn assign_pool_index(user_id: &str, date: Date, pool_size: usize) -> usize {
    assert!(pool_size > 0, "pool must not be empty");
    (digest_prefix_u64(&format!("{user_id}_{date}")) % pool_size as u64) as usize
}
