//! In-memory provider fakes shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use waypost::domain::geo::Location;
use waypost::domain::photos::{DateWindow, PhotoItem};
use waypost::domain::route::{RouteLeg, RoutePreference, Vehicle, Waypoint};
use waypost::providers::{
    DurableStore, DurableStoreError, LanguageModel, PhotoLibrary, ProviderError, RoutingProvider,
};

/// Durable tier backed by a path-keyed map with subtree deletion.
#[derive(Default)]
pub struct MemoryDurable {
    records: Mutex<HashMap<String, Value>>,
    pub writes: AtomicUsize,
}

impl MemoryDurable {
    pub async fn record(&self, path: &str) -> Option<Value> {
        self.records.lock().await.get(path).cloned()
    }
}

#[async_trait]
impl DurableStore for MemoryDurable {
    async fn read(&self, path: &str) -> Result<Option<Value>, DurableStoreError> {
        Ok(self.records.lock().await.get(path).cloned())
    }

    async fn write(&self, path: &str, record: Value) -> Result<(), DurableStoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.records.lock().await.insert(path.to_string(), record);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), DurableStoreError> {
        let prefix = format!("{path}/");
        self.records
            .lock()
            .await
            .retain(|key, _| key != path && !key.starts_with(&prefix));
        Ok(())
    }
}

/// Durable tier where every operation fails.
pub struct BrokenDurable;

#[async_trait]
impl DurableStore for BrokenDurable {
    async fn read(&self, _path: &str) -> Result<Option<Value>, DurableStoreError> {
        Err(DurableStoreError::new("durable tier offline"))
    }

    async fn write(&self, _path: &str, _record: Value) -> Result<(), DurableStoreError> {
        Err(DurableStoreError::new("durable tier offline"))
    }

    async fn delete(&self, _path: &str) -> Result<(), DurableStoreError> {
        Err(DurableStoreError::new("durable tier offline"))
    }
}

/// Routing provider that counts calls and either serves a canned leg or
/// fails.
pub struct CountingRouter {
    pub calls: AtomicUsize,
    pub fail: bool,
    pub delay: Duration,
}

impl CountingRouter {
    pub fn working() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
            delay: Duration::ZERO,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
            delay: Duration::ZERO,
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
            delay,
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoutingProvider for CountingRouter {
    async fn compute_route(
        &self,
        start: &Location,
        end: &Location,
        _vehicle: Vehicle,
        _preference: RoutePreference,
    ) -> Result<Vec<RouteLeg>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(ProviderError::unavailable("routing upstream down"));
        }
        Ok(vec![RouteLeg {
            route_id: 0,
            route_type: "fastest".to_string(),
            total_distance_km: 245.0,
            estimated_time_hours: 3.2,
            geometry: vec![[start.lat, start.lng], [end.lat, end.lng]],
            waypoints: vec![Waypoint {
                name: end.name.clone(),
                lat: end.lat,
                lng: end.lng,
            }],
        }])
    }
}

/// Language model that emits well-formed hotspot JSON, optionally failing
/// on selected call indices (zero-based).
pub struct ScriptedModel {
    pub calls: AtomicUsize,
    pub fail_on: Vec<usize>,
}

impl ScriptedModel {
    pub fn working() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_on: Vec::new(),
        })
    }

    pub fn failing_on(indices: Vec<usize>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_on: indices,
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String, ProviderError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.contains(&index) {
            return Err(ProviderError::RateLimited);
        }
        Ok(format!(
            "Here you go: {{\"story\": \"Feature {index}.\", \
             \"highlights\": [\"one\", \"two\", \"three\"], \
             \"best_time_to_visit\": \"April to October\", \
             \"travel_tips\": \"Travel light.\"}}"
        ))
    }
}

/// Photo library that records the last search window.
#[derive(Default)]
pub struct ScriptedLibrary {
    pub calls: AtomicUsize,
    pub last_window: Mutex<Option<DateWindow>>,
}

impl ScriptedLibrary {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhotoLibrary for ScriptedLibrary {
    async fn search(
        &self,
        _access_token: &str,
        window: &DateWindow,
    ) -> Result<Vec<PhotoItem>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_window.lock().await = Some(*window);
        Ok(vec![
            PhotoItem {
                id: "p1".to_string(),
                base_url: "https://photos.example/p1".to_string(),
                filename: "p1.jpg".to_string(),
                mime_type: "image/jpeg".to_string(),
                creation_time: None,
                width: Some(4000),
                height: Some(3000),
            },
            PhotoItem {
                id: "p2".to_string(),
                base_url: "https://photos.example/p2".to_string(),
                filename: "p2.jpg".to_string(),
                mime_type: "image/jpeg".to_string(),
                creation_time: None,
                width: None,
                height: None,
            },
        ])
    }
}

pub fn sample_trip() -> waypost::domain::photos::TripDetails {
    waypost::domain::photos::TripDetails {
        id: "trip-77".to_string(),
        title: "Hunza by road".to_string(),
        start_date: time::macros::date!(2026 - 06 - 10),
        duration_days: 5,
        start_location: islamabad(),
        destinations: vec![Location::new("Hunza", 36.3167, 74.65)],
    }
}

pub fn islamabad() -> Location {
    Location::new("Islamabad", 33.6844, 73.0479)
}

pub fn rawalpindi() -> Location {
    Location::new("Rawalpindi", 33.5651, 73.0169)
}

pub fn lahore() -> Location {
    Location::new("Lahore", 31.5204, 74.3587)
}

pub fn karachi() -> Location {
    Location::new("Karachi", 24.8607, 67.0011)
}
