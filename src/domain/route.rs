//! Route plans and distance-banded estimation.
//!
//! When the routing provider cannot serve a leg (distance beyond its limits
//! or an outage), we fall back to a deterministic estimate: a straight-line
//! geometry stub with a duration derived from per-vehicle average speeds
//! banded by distance.

use serde::{Deserialize, Serialize};

use super::geo::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vehicle {
    Car,
    Bike,
}

impl Vehicle {
    /// Parses loosely, matching what clients historically sent.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "bike" | "motorcycle" => Self::Bike,
            _ => Self::Car,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Bike => "bike",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutePreference {
    Fastest,
    Shortest,
    Scenic,
}

impl RoutePreference {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "shortest" => Self::Shortest,
            "scenic" => Self::Scenic,
            _ => Self::Fastest,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fastest => "fastest",
            Self::Shortest => "shortest",
            Self::Scenic => "scenic",
        }
    }
}

/// Outcome quality of a route computation.
///
/// Only `Success` and `Estimated` plans are cacheable; `Basic` is the total
/// failure fallback and must be recomputed on the next request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Success,
    Estimated,
    Basic,
}

impl RouteStatus {
    pub fn is_cacheable(self) -> bool {
        matches!(self, Self::Success | Self::Estimated)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl From<&Location> for Waypoint {
    fn from(location: &Location) -> Self {
        Self {
            name: location.name.clone(),
            lat: location.lat,
            lng: location.lng,
        }
    }
}

/// One drivable route variant returned by the provider or the estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub route_id: u32,
    pub route_type: String,
    pub total_distance_km: f64,
    pub estimated_time_hours: f64,
    /// `[lng, lat]` pairs, provider convention.
    pub geometry: Vec<[f64; 2]>,
    pub waypoints: Vec<Waypoint>,
}

/// The computed plan handed back to callers and stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub status: RouteStatus,
    pub method: String,
    pub total_distance_km: f64,
    pub estimated_time_hours: f64,
    /// Straight-line distance between the endpoints, kept for clients that
    /// show it alongside the road distance.
    pub distance_km: f64,
    pub routes: Vec<RouteLeg>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

struct SpeedTable {
    highway: f64,
    city: f64,
}

const fn speeds(vehicle: Vehicle) -> SpeedTable {
    match vehicle {
        Vehicle::Car => SpeedTable {
            highway: 80.0,
            city: 40.0,
        },
        Vehicle::Bike => SpeedTable {
            highway: 70.0,
            city: 35.0,
        },
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Deterministic long-distance estimate: straight-line geometry plus a
/// duration from distance-banded average speeds.
pub fn estimate_route(start: &Location, end: &Location, vehicle: Vehicle, distance_km: f64) -> RouteLeg {
    let table = speeds(vehicle);

    let (avg_speed, route_type) = if distance_km > 500.0 {
        // Discounts account for stops and traffic on long hauls.
        (table.highway * 0.8, "Long-distance highway route")
    } else if distance_km > 200.0 {
        (table.highway * 0.7, "Inter-city route")
    } else {
        (table.city * 1.2, "Regional route")
    };

    RouteLeg {
        route_id: 0,
        route_type: route_type.to_string(),
        total_distance_km: round1(distance_km),
        estimated_time_hours: round1(distance_km / avg_speed),
        geometry: vec![[start.lng, start.lat], [end.lng, end.lat]],
        waypoints: vec![Waypoint::from(start), Waypoint::from(end)],
    }
}

/// Minimal plan for when both the provider and the estimator are out of
/// reach. Assumes a 50 km/h average; callers see the failure note.
pub fn basic_plan(distance_km: f64, error: impl Into<String>) -> RoutePlan {
    RoutePlan {
        status: RouteStatus::Basic,
        method: "fallback".to_string(),
        total_distance_km: round1(distance_km),
        estimated_time_hours: round1(distance_km / 50.0),
        distance_km,
        routes: Vec::new(),
        note: Some(format!(
            "Unable to calculate detailed route: {}",
            error.into()
        )),
    }
}
