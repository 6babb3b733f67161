//! Trip photo search types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};

use super::error::DomainError;
use super::geo::Location;

/// The slice of a trip this crate needs to search a photo library.
///
/// Full trip records live in the excluded storage layer; callers pass this
/// projection in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripDetails {
    pub id: String,
    pub title: String,
    pub start_date: Date,
    pub duration_days: u32,
    pub start_location: Location,
    pub destinations: Vec<Location>,
}

/// Inclusive date range submitted to the photo library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: Date,
    pub end: Date,
}

impl DateWindow {
    /// Window for a trip, padded a day on each side for travel time.
    pub fn for_trip(trip: &TripDetails) -> Result<Self, DomainError> {
        let start = trip
            .start_date
            .checked_sub(Duration::days(1))
            .ok_or_else(|| DomainError::validation("trip start date out of range"))?;
        let end = trip
            .start_date
            .checked_add(Duration::days(i64::from(trip.duration_days) + 1))
            .ok_or_else(|| DomainError::validation("trip duration out of range"))?;
        Ok(Self { start, end })
    }
}

/// A raw media item returned by the photo library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoItem {
    pub id: String,
    pub base_url: String,
    pub filename: String,
    pub mime_type: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub creation_time: Option<OffsetDateTime>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A photo enriched with trip context and display URL variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPhoto {
    #[serde(flatten)]
    pub item: PhotoItem,
    pub thumbnail_url: String,
    pub display_url: String,
    /// Best-effort guess, not a correctness guarantee: with one destination
    /// every photo is attributed to it, otherwise to the first destination.
    pub potential_location: String,
}

/// Cached result of one (user, trip) photo search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPhotoSet {
    pub trip_id: String,
    pub photos_found: usize,
    pub photo_items: Vec<TripPhoto>,
    pub search_window: DateWindow,
    #[serde(with = "time::serde::rfc3339")]
    pub scanned_at: OffsetDateTime,
}

impl TripPhotoSet {
    /// Groups photos by the calendar day they were taken, for the journal
    /// layer. Photos without a creation time are skipped.
    pub fn by_day(&self) -> BTreeMap<Date, Vec<&TripPhoto>> {
        let mut groups: BTreeMap<Date, Vec<&TripPhoto>> = BTreeMap::new();
        for photo in &self.photo_items {
            if let Some(taken) = photo.item.creation_time {
                groups.entry(taken.date()).or_default().push(photo);
            }
        }
        groups
    }
}
