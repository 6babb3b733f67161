//! Trip photo search policy.
//!
//! Photo library results are expensive to fetch and go stale quickly, so
//! this layer caches per (user, trip) in the fast tier only with a short
//! TTL. Searches for the same key collapse into one upstream call.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::cache::{CacheConfig, Fingerprint, KeyBuilder, SingleFlight, TieredCache};
use crate::config::ProviderSettings;
use crate::domain::photos::{DateWindow, TripDetails, TripPhoto, TripPhotoSet};
use crate::providers::{PhotoLibrary, ProviderError};

use super::error::AppError;

const THUMBNAIL_VARIANT: &str = "=w400-h300-c";
const DISPLAY_VARIANT: &str = "=w800-h600-c";

pub struct TripPhotoService {
    cache: Arc<TieredCache>,
    flight: SingleFlight,
    library: Arc<dyn PhotoLibrary>,
    photo_ttl: Duration,
    library_timeout: Duration,
}

impl TripPhotoService {
    pub fn new(
        cache: Arc<TieredCache>,
        flight: SingleFlight,
        library: Arc<dyn PhotoLibrary>,
        cache_config: &CacheConfig,
        providers: &ProviderSettings,
    ) -> Self {
        Self {
            cache,
            flight,
            library,
            photo_ttl: cache_config.photo_ttl(),
            library_timeout: providers.photo_timeout(),
        }
    }

    fn search_key(user_id: &str, trip_id: &str) -> Fingerprint {
        KeyBuilder::new("photos")
            .param("user", user_id)
            .param("trip", trip_id)
            .build()
    }

    /// Photos from the user's library taken during the trip window.
    ///
    /// The access token authenticates the upstream search and never enters
    /// the cache key; a cached result is shared across token refreshes for
    /// the same user.
    #[instrument(skip(self, access_token, trip), fields(trip_id = %trip.id))]
    pub async fn search_trip_photos(
        &self,
        access_token: &str,
        user_id: &str,
        trip: &TripDetails,
    ) -> Result<TripPhotoSet, AppError> {
        let key = Self::search_key(user_id, &trip.id);

        if let Some(set) = self.cache.get_fast_as::<TripPhotoSet>(&key) {
            return Ok(set);
        }

        let result = self
            .flight
            .run_exclusive(
                &key,
                || async { self.cache.get_fast_as::<TripPhotoSet>(&key) },
                || self.search_and_cache(&key, access_token, trip),
            )
            .await;
        result.map_err(AppError::from)
    }

    async fn search_and_cache(
        &self,
        key: &Fingerprint,
        access_token: &str,
        trip: &TripDetails,
    ) -> Result<TripPhotoSet, AppError> {
        counter!("waypost_photo_search_total").increment(1);
        let window = DateWindow::for_trip(trip)?;

        let items = match tokio::time::timeout(
            self.library_timeout,
            self.library.search(access_token, &window),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(ProviderError::Timeout.into()),
        };

        info!(found = items.len(), "photo library search complete");
        let set = TripPhotoSet {
            trip_id: trip.id.clone(),
            photos_found: items.len(),
            photo_items: items
                .into_iter()
                .map(|item| enhance(item, trip))
                .collect(),
            search_window: window,
            scanned_at: OffsetDateTime::now_utc(),
        };

        if let Ok(value) = serde_json::to_value(&set) {
            self.cache.put_fast(key, value, self.photo_ttl);
        }
        Ok(set)
    }

    /// Evicts one (user, trip) search result so the next call hits the
    /// library again.
    pub fn invalidate(&self, user_id: &str, trip_id: &str) {
        self.cache.invalidate_fast(&Self::search_key(user_id, trip_id));
    }
}

fn enhance(item: crate::domain::photos::PhotoItem, trip: &TripDetails) -> TripPhoto {
    let potential_location = match trip.destinations.as_slice() {
        [] => trip.start_location.name.clone(),
        [only] => only.name.clone(),
        [first, ..] => first.name.clone(),
    };
    TripPhoto {
        thumbnail_url: format!("{}{THUMBNAIL_VARIANT}", item.base_url),
        display_url: format!("{}{DISPLAY_VARIANT}", item.base_url),
        potential_location,
        item,
    }
}
