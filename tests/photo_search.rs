//! Trip photo search caching and enrichment.

use std::sync::Arc;

use time::macros::date;

use waypost::application::photos::TripPhotoService;
use waypost::cache::{CacheConfig, SingleFlight, TieredCache};
use waypost::config::ProviderSettings;
use waypost::domain::geo::Location;
use waypost::domain::photos::TripDetails;

mod support;
use support::{MemoryDurable, ScriptedLibrary, islamabad};

fn service(library: Arc<ScriptedLibrary>) -> (TripPhotoService, Arc<MemoryDurable>) {
    let config = CacheConfig::default();
    let durable = Arc::new(MemoryDurable::default());
    let cache = Arc::new(TieredCache::new(&config, durable.clone()));
    let flight = SingleFlight::new(config.waiter_timeout());
    let service = TripPhotoService::new(
        cache,
        flight,
        library,
        &config,
        &ProviderSettings::default(),
    );
    (service, durable)
}

fn trip() -> TripDetails {
    TripDetails {
        id: "trip-77".to_string(),
        title: "Hunza by road".to_string(),
        start_date: date!(2026 - 06 - 10),
        duration_days: 5,
        start_location: islamabad(),
        destinations: vec![Location::new("Hunza", 36.3167, 74.65)],
    }
}

#[tokio::test]
async fn search_window_pads_the_trip_by_one_day() {
    let library = Arc::new(ScriptedLibrary::default());
    let (service, _) = service(library.clone());

    let set = service
        .search_trip_photos("token", "user-1", &trip())
        .await
        .expect("photo set");

    let window = library.last_window.lock().await.expect("window recorded");
    assert_eq!(window.start, date!(2026 - 06 - 09));
    assert_eq!(window.end, date!(2026 - 06 - 16));
    assert_eq!(set.search_window, window);
}

#[tokio::test]
async fn repeat_search_is_served_from_cache() {
    let library = Arc::new(ScriptedLibrary::default());
    let (service, durable) = service(library.clone());

    let first = service
        .search_trip_photos("token", "user-1", &trip())
        .await
        .expect("first search");
    let second = service
        .search_trip_photos("refreshed-token", "user-1", &trip())
        .await
        .expect("cached search");

    // The token is not part of the key, so a refreshed token still hits.
    assert_eq!(second, first);
    assert_eq!(library.call_count(), 1);
    // Photo results never reach the durable tier.
    assert_eq!(durable.writes.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn photos_carry_display_variants_and_location_guess() {
    let library = Arc::new(ScriptedLibrary::default());
    let (service, _) = service(library);

    let set = service
        .search_trip_photos("token", "user-1", &trip())
        .await
        .expect("photo set");

    assert_eq!(set.photos_found, 2);
    let photo = &set.photo_items[0];
    assert_eq!(photo.thumbnail_url, format!("{}=w400-h300-c", photo.item.base_url));
    assert_eq!(photo.display_url, format!("{}=w800-h600-c", photo.item.base_url));
    assert_eq!(photo.potential_location, "Hunza");
}

#[tokio::test]
async fn different_users_do_not_share_results() {
    let library = Arc::new(ScriptedLibrary::default());
    let (service, _) = service(library.clone());

    service
        .search_trip_photos("token-a", "user-a", &trip())
        .await
        .expect("first user");
    service
        .search_trip_photos("token-b", "user-b", &trip())
        .await
        .expect("second user");
    assert_eq!(library.call_count(), 2);
}

#[tokio::test]
async fn pool_cache_clear_leaves_photo_entries_alone() {
    let config = CacheConfig::default();
    let durable = Arc::new(MemoryDurable::default());
    let cache = Arc::new(TieredCache::new(&config, durable.clone()));
    let flight = SingleFlight::new(config.waiter_timeout());

    let library = Arc::new(ScriptedLibrary::default());
    let photos = TripPhotoService::new(
        Arc::clone(&cache),
        flight.clone(),
        library.clone(),
        &config,
        &ProviderSettings::default(),
    );
    let hotspots = waypost::application::hotspots::DailyHotspotService::new(
        cache,
        flight,
        support::ScriptedModel::working(),
        durable,
        &config,
        &ProviderSettings::default(),
    );

    photos
        .search_trip_photos("token", "user-1", &trip())
        .await
        .expect("first search");
    hotspots
        .get_or_generate_pool(date!(2026 - 08 - 29))
        .await
        .expect("pool");

    // The pool admin surface sees only its own entry in the shared store,
    // and clearing it does not evict the photo result.
    assert_eq!(hotspots.cache_info().entry_count, 1);
    hotspots.clear_cache(None);

    photos
        .search_trip_photos("token", "user-1", &trip())
        .await
        .expect("still cached");
    assert_eq!(library.call_count(), 1);
}

#[tokio::test]
async fn invalidate_forces_a_new_search() {
    let library = Arc::new(ScriptedLibrary::default());
    let (service, _) = service(library.clone());

    service
        .search_trip_photos("token", "user-1", &trip())
        .await
        .expect("first search");
    service.invalidate("user-1", "trip-77");
    service
        .search_trip_photos("token", "user-1", &trip())
        .await
        .expect("fresh search");
    assert_eq!(library.call_count(), 2);
}
