//! Route calculation policy.
//!
//! Routes are cached for 24 hours under a fingerprint of the normalized
//! endpoints, vehicle, and preference, with concurrent requests for the same
//! route collapsed into one provider call. The computation itself picks a
//! strategy by straight-line distance: the provider handles short legs, long
//! legs fall back to deterministic estimation, and a total failure yields an
//! uncacheable basic plan.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{info, instrument, warn};

use crate::cache::{CacheConfig, CacheReport, Fingerprint, KeyBuilder, SingleFlight, TieredCache};
use crate::config::ProviderSettings;
use crate::domain::geo::{Location, haversine_km};
use crate::domain::route::{
    RouteLeg, RoutePlan, RoutePreference, RouteStatus, Vehicle, basic_plan, estimate_route,
};
use crate::providers::{ProviderError, RoutingProvider};

use super::error::AppError;

const OPERATION: &str = "route";

/// Below this straight-line distance the provider is called directly.
const DIRECT_LIMIT_KM: f64 = 120.0;
/// Between the direct limit and this, the provider is tried with the
/// estimator as fallback; beyond it the estimator is used outright.
const FALLBACK_LIMIT_KM: f64 = 300.0;

/// Route cache statistics exposed to the admin surface.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RouteCacheStats {
    pub cached_entries: usize,
    pub in_flight: usize,
    pub sample_keys: Vec<String>,
}

pub struct RouteService {
    cache: Arc<TieredCache>,
    flight: SingleFlight,
    provider: Arc<dyn RoutingProvider>,
    route_ttl: Duration,
    provider_timeout: Duration,
}

impl RouteService {
    pub fn new(
        cache: Arc<TieredCache>,
        flight: SingleFlight,
        provider: Arc<dyn RoutingProvider>,
        cache_config: &CacheConfig,
        providers: &ProviderSettings,
    ) -> Self {
        Self {
            cache,
            flight,
            provider,
            route_ttl: cache_config.route_ttl(),
            provider_timeout: providers.routing_timeout(),
        }
    }

    fn route_key(
        start: &Location,
        end: &Location,
        vehicle: Vehicle,
        preference: RoutePreference,
    ) -> Fingerprint {
        KeyBuilder::new(OPERATION)
            .param("start", &start.name)
            .param("end", &end.name)
            .param("vehicle", vehicle.as_str())
            .param("preference", preference.as_str())
            .build()
    }

    /// Returns the cached or freshly computed plan for a route.
    ///
    /// Parallel calls for the same route share one provider computation;
    /// only `Success` and `Estimated` plans enter the cache.
    #[instrument(skip(self), fields(start = %start.name, end = %end.name))]
    pub async fn calculate_route(
        &self,
        start: &Location,
        end: &Location,
        vehicle: Vehicle,
        preference: RoutePreference,
    ) -> Result<RoutePlan, AppError> {
        let key = Self::route_key(start, end, vehicle, preference);

        if let Some(plan) = self.cache.get_as::<RoutePlan>(&key).await {
            return Ok(plan);
        }

        let result = self
            .flight
            .run_exclusive(
                &key,
                || self.cache.get_as::<RoutePlan>(&key),
                || self.compute_and_cache(&key, start, end, vehicle, preference),
            )
            .await;
        result.map_err(AppError::from)
    }

    async fn compute_and_cache(
        &self,
        key: &Fingerprint,
        start: &Location,
        end: &Location,
        vehicle: Vehicle,
        preference: RoutePreference,
    ) -> Result<RoutePlan, AppError> {
        counter!("waypost_route_compute_total").increment(1);
        let plan = self.compute_plan(start, end, vehicle, preference).await?;

        if plan.status.is_cacheable() {
            let record = serde_json::to_value(&plan)
                .map_err(|err| AppError::unexpected(format!("route plan not serializable: {err}")))?;
            self.cache.put(key, record, self.route_ttl).await;
        }
        Ok(plan)
    }

    async fn compute_plan(
        &self,
        start: &Location,
        end: &Location,
        vehicle: Vehicle,
        preference: RoutePreference,
    ) -> Result<RoutePlan, AppError> {
        let distance_km = haversine_km(start, end);
        info!(distance_km, vehicle = vehicle.as_str(), "calculating route");

        if distance_km <= DIRECT_LIMIT_KM {
            return match self.direct(start, end, vehicle, preference).await {
                Ok(legs) => Ok(Self::success_plan(legs, distance_km)),
                Err(err) if err.is_fatal() => Err(err.into()),
                Err(err) => {
                    warn!(error = %err, "provider failed with no estimation band, returning basic plan");
                    Ok(basic_plan(distance_km, err.to_string()))
                }
            };
        }

        if distance_km <= FALLBACK_LIMIT_KM {
            match self.direct(start, end, vehicle, preference).await {
                Ok(legs) => return Ok(Self::success_plan(legs, distance_km)),
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => {
                    warn!(error = %err, "provider failed on long leg, falling back to estimation");
                }
            }
        }

        let leg = estimate_route(start, end, vehicle, distance_km);
        Ok(RoutePlan {
            status: RouteStatus::Estimated,
            method: "deterministic_estimation".to_string(),
            total_distance_km: leg.total_distance_km,
            estimated_time_hours: leg.estimated_time_hours,
            distance_km,
            routes: vec![leg],
            note: Some("Route estimated due to long distance. Actual route may vary.".to_string()),
        })
    }

    async fn direct(
        &self,
        start: &Location,
        end: &Location,
        vehicle: Vehicle,
        preference: RoutePreference,
    ) -> Result<Vec<RouteLeg>, ProviderError> {
        match tokio::time::timeout(
            self.provider_timeout,
            self.provider.compute_route(start, end, vehicle, preference),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        }
    }

    fn success_plan(legs: Vec<RouteLeg>, distance_km: f64) -> RoutePlan {
        let (total_distance_km, estimated_time_hours) = legs
            .first()
            .map(|leg| (leg.total_distance_km, leg.estimated_time_hours))
            .unwrap_or((distance_km, distance_km / 50.0));
        RoutePlan {
            status: RouteStatus::Success,
            method: "routing_provider".to_string(),
            total_distance_km,
            estimated_time_hours,
            distance_km,
            routes: legs,
            note: None,
        }
    }

    /// Cache usage snapshot for the admin surface: the store's route-scoped
    /// report plus in-flight computations. Entries other policies keep in
    /// the shared store are not counted.
    pub fn cache_stats(&self) -> RouteCacheStats {
        let report: CacheReport = self.cache.report_scope(OPERATION);
        RouteCacheStats {
            cached_entries: report.entry_count,
            in_flight: self.flight.in_flight(),
            sample_keys: report
                .entries
                .iter()
                .take(5)
                .map(|entry| entry.key.clone())
                .collect(),
        }
    }

    /// Drops every cached route plan from both tiers, leaving the other
    /// policies' entries in the shared store alone.
    pub async fn clear_cache(&self) {
        self.cache.clear_scope(OPERATION).await;
    }
}
