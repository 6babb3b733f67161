//! Route policy behavior across the two cache tiers.

use std::sync::Arc;
use std::time::Duration;

use waypost::application::routes::RouteService;
use waypost::cache::{CacheConfig, SingleFlight, TieredCache};
use waypost::config::ProviderSettings;
use waypost::domain::route::{RoutePreference, RouteStatus, Vehicle};
use waypost::providers::{DurableStore, RoutingProvider};

mod support;
use support::{BrokenDurable, CountingRouter, MemoryDurable, islamabad, karachi, lahore, rawalpindi};

fn service(
    provider: Arc<dyn RoutingProvider>,
    durable: Arc<dyn DurableStore>,
) -> (RouteService, Arc<TieredCache>) {
    let config = CacheConfig::default();
    let cache = Arc::new(TieredCache::new(&config, durable));
    let flight = SingleFlight::new(config.waiter_timeout());
    let service = RouteService::new(
        Arc::clone(&cache),
        flight,
        provider,
        &config,
        &ProviderSettings::default(),
    );
    (service, cache)
}

#[tokio::test]
async fn second_call_is_served_from_cache() {
    let router = CountingRouter::working();
    let (service, _) = service(router.clone(), Arc::new(MemoryDurable::default()));

    let first = service
        .calculate_route(&islamabad(), &rawalpindi(), Vehicle::Car, RoutePreference::Fastest)
        .await
        .expect("first route");
    assert_eq!(first.status, RouteStatus::Success);

    let second = service
        .calculate_route(&islamabad(), &rawalpindi(), Vehicle::Car, RoutePreference::Fastest)
        .await
        .expect("cached route");
    assert_eq!(second, first);
    assert_eq!(router.call_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_for_one_route_call_upstream_once() {
    let router = CountingRouter::slow(Duration::from_millis(80));
    let (service, _) = service(router.clone(), Arc::new(MemoryDurable::default()));
    let service = Arc::new(service);

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        tasks.push(tokio::spawn(async move {
            service
                .calculate_route(
                    &islamabad(),
                    &rawalpindi(),
                    Vehicle::Car,
                    RoutePreference::Fastest,
                )
                .await
        }));
    }
    for task in tasks {
        task.await.expect("task").expect("route");
    }
    assert_eq!(router.call_count(), 1);
}

#[tokio::test]
async fn short_route_failure_degrades_to_basic_and_is_not_cached() {
    let router = CountingRouter::failing();
    let (service, _) = service(router.clone(), Arc::new(MemoryDurable::default()));

    for _ in 0..2 {
        let plan = service
            .calculate_route(&islamabad(), &rawalpindi(), Vehicle::Car, RoutePreference::Fastest)
            .await
            .expect("basic fallback plan");
        assert_eq!(plan.status, RouteStatus::Basic);
    }
    // Basic plans carry no geometry, so every request retries upstream.
    assert_eq!(router.call_count(), 2);
}

#[tokio::test]
async fn medium_route_failure_falls_back_to_estimation_and_caches_it() {
    let router = CountingRouter::failing();
    let (service, _) = service(router.clone(), Arc::new(MemoryDurable::default()));

    let plan = service
        .calculate_route(&islamabad(), &lahore(), Vehicle::Car, RoutePreference::Fastest)
        .await
        .expect("estimated plan");
    assert_eq!(plan.status, RouteStatus::Estimated);
    assert_eq!(plan.method, "deterministic_estimation");

    let cached = service
        .calculate_route(&islamabad(), &lahore(), Vehicle::Car, RoutePreference::Fastest)
        .await
        .expect("cached estimated plan");
    assert_eq!(cached, plan);
    assert_eq!(router.call_count(), 1);
}

#[tokio::test]
async fn long_route_is_estimated_without_calling_upstream() {
    let router = CountingRouter::failing();
    let (service, _) = service(router.clone(), Arc::new(MemoryDurable::default()));

    let plan = service
        .calculate_route(&islamabad(), &karachi(), Vehicle::Car, RoutePreference::Fastest)
        .await
        .expect("estimated plan");
    assert_eq!(plan.status, RouteStatus::Estimated);
    assert!(plan.note.is_some());
    assert_eq!(router.call_count(), 0);
}

#[tokio::test]
async fn durable_tier_serves_a_fresh_process() {
    let durable = Arc::new(MemoryDurable::default());
    let router = CountingRouter::working();

    let (first_service, _) = service(router.clone(), durable.clone());
    first_service
        .calculate_route(&islamabad(), &rawalpindi(), Vehicle::Car, RoutePreference::Fastest)
        .await
        .expect("first route");

    // A new service with an empty fast tier shares only the durable tier.
    let (second_service, _) = service(router.clone(), durable);
    second_service
        .calculate_route(&islamabad(), &rawalpindi(), Vehicle::Car, RoutePreference::Fastest)
        .await
        .expect("durable hit");
    assert_eq!(router.call_count(), 1);
}

#[tokio::test]
async fn durable_outage_is_transparent_to_callers() {
    let router = CountingRouter::working();
    let (service, _) = service(router.clone(), Arc::new(BrokenDurable));

    let plan = service
        .calculate_route(&islamabad(), &rawalpindi(), Vehicle::Car, RoutePreference::Fastest)
        .await
        .expect("route despite durable outage");
    assert_eq!(plan.status, RouteStatus::Success);

    // The fast tier still dedupes while the durable tier is down.
    service
        .calculate_route(&islamabad(), &rawalpindi(), Vehicle::Car, RoutePreference::Fastest)
        .await
        .expect("fast-tier hit");
    assert_eq!(router.call_count(), 1);
}

#[tokio::test]
async fn clear_cache_forces_recomputation() {
    let router = CountingRouter::working();
    let (service, _) = service(router.clone(), Arc::new(MemoryDurable::default()));

    service
        .calculate_route(&islamabad(), &rawalpindi(), Vehicle::Car, RoutePreference::Fastest)
        .await
        .expect("first route");
    let stats = service.cache_stats();
    assert_eq!(stats.cached_entries, 1);
    assert_eq!(stats.in_flight, 0);

    service.clear_cache().await;
    service
        .calculate_route(&islamabad(), &rawalpindi(), Vehicle::Car, RoutePreference::Fastest)
        .await
        .expect("recomputed route");
    assert_eq!(router.call_count(), 2);
}

#[tokio::test]
async fn route_admin_operations_are_scoped_to_route_entries() {
    let config = CacheConfig::default();
    let durable = Arc::new(MemoryDurable::default());
    let cache = Arc::new(TieredCache::new(&config, durable));
    let flight = SingleFlight::new(config.waiter_timeout());

    let router = CountingRouter::working();
    let routes = RouteService::new(
        Arc::clone(&cache),
        flight.clone(),
        router.clone(),
        &config,
        &ProviderSettings::default(),
    );
    let library = Arc::new(support::ScriptedLibrary::default());
    let photos = waypost::application::photos::TripPhotoService::new(
        cache,
        flight,
        library.clone(),
        &config,
        &ProviderSettings::default(),
    );

    routes
        .calculate_route(&islamabad(), &rawalpindi(), Vehicle::Car, RoutePreference::Fastest)
        .await
        .expect("route");
    photos
        .search_trip_photos("token", "user-1", &support::sample_trip())
        .await
        .expect("photo search");

    // Stats count the route entry, not the photo entry in the shared store.
    assert_eq!(routes.cache_stats().cached_entries, 1);

    routes.clear_cache().await;
    routes
        .calculate_route(&islamabad(), &rawalpindi(), Vehicle::Car, RoutePreference::Fastest)
        .await
        .expect("recomputed route");
    assert_eq!(router.call_count(), 2);

    // The photo result survived the route cache clear.
    photos
        .search_trip_photos("token", "user-1", &support::sample_trip())
        .await
        .expect("still cached");
    assert_eq!(library.call_count(), 1);
}

#[tokio::test]
async fn vehicle_is_part_of_the_cache_key() {
    let router = CountingRouter::working();
    let (service, _) = service(router.clone(), Arc::new(MemoryDurable::default()));

    service
        .calculate_route(&islamabad(), &rawalpindi(), Vehicle::Car, RoutePreference::Fastest)
        .await
        .expect("car route");
    service
        .calculate_route(&islamabad(), &rawalpindi(), Vehicle::Bike, RoutePreference::Fastest)
        .await
        .expect("bike route");
    assert_eq!(router.call_count(), 2);
}
