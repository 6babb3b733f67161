//! Daily hotspot pool policy.
//!
//! One pool of language-model-described destinations is generated per
//! calendar day and shared by every user; a pure hash assigns each user
//! their hotspot. The durable record at `hotspot_pools/{date}` is the
//! source of truth for "already generated today" and carries no TTL; the
//! fast-tier copy expires hourly, forcing periodic revalidation against the
//! durable tier within the day.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Deserialize;
use time::{Date, OffsetDateTime};
use tracing::{info, instrument, warn};

use crate::cache::{CacheConfig, CacheReport, Fingerprint, KeyBuilder, SingleFlight, TieredCache};
use crate::config::ProviderSettings;
use crate::domain::hotspot::{
    AssignedHotspot, CATALOG, DailyPool, Destination, Hotspot, assign_pool_index, select_for_date,
};
use crate::providers::{DurableStore, LanguageModel, ProviderError};

use super::error::AppError;

const OPERATION: &str = "daily_pool";
const POOL_ROOT: &str = "hotspot_pools";
const CONTENT_MAX_TOKENS: u32 = 1200;

/// The JSON object the language model is instructed to produce per hotspot.
#[derive(Debug, Deserialize)]
struct HotspotContent {
    story: String,
    highlights: Vec<String>,
    best_time_to_visit: String,
    travel_tips: String,
}

pub struct DailyHotspotService {
    cache: Arc<TieredCache>,
    flight: SingleFlight,
    model: Arc<dyn LanguageModel>,
    durable: Arc<dyn DurableStore>,
    pool_fast_ttl: Duration,
    hotspots_per_day: usize,
    model_timeout: Duration,
}

impl DailyHotspotService {
    pub fn new(
        cache: Arc<TieredCache>,
        flight: SingleFlight,
        model: Arc<dyn LanguageModel>,
        durable: Arc<dyn DurableStore>,
        cache_config: &CacheConfig,
        providers: &ProviderSettings,
    ) -> Self {
        Self {
            cache,
            flight,
            model,
            durable,
            pool_fast_ttl: cache_config.pool_fast_ttl(),
            hotspots_per_day: cache_config.hotspots_per_day,
            model_timeout: providers.model_timeout(),
        }
    }

    fn pool_key(date: Date) -> Fingerprint {
        KeyBuilder::new(OPERATION)
            .param("date", &date.to_string())
            .build()
    }

    fn pool_path(date: Date) -> String {
        format!("{POOL_ROOT}/{date}")
    }

    /// The hotspot assigned to a user for a date.
    ///
    /// The same user always sees the same pool item on a given day; distinct
    /// users are spread across the pool.
    pub async fn user_hotspot(&self, user_id: &str, date: Date) -> Result<AssignedHotspot, AppError> {
        let pool = self.get_or_generate_pool(date).await?;
        if pool.hotspots.is_empty() {
            return Err(crate::domain::error::DomainError::invariant("daily pool is empty").into());
        }
        let index = assign_pool_index(user_id, date, pool.hotspots.len());
        let hotspot = pool.hotspots[index].clone();

        let user_tag: String = user_id.chars().take(8).collect();
        Ok(AssignedHotspot {
            id: format!("{date}_{user_tag}_{index}"),
            hotspot,
            user_index: index,
            pool_size: pool.hotspots.len(),
        })
    }

    /// Returns the day's pool, generating it at most once process-wide.
    #[instrument(skip(self))]
    pub async fn get_or_generate_pool(&self, date: Date) -> Result<DailyPool, AppError> {
        let key = Self::pool_key(date);

        if let Some(pool) = self.cache.get_fast_as::<DailyPool>(&key) {
            return Ok(pool);
        }

        let result = self
            .flight
            .run_exclusive(
                &key,
                || async { self.cache.get_fast_as::<DailyPool>(&key) },
                || self.load_or_generate(&key, date),
            )
            .await;
        result.map_err(AppError::from)
    }

    async fn load_or_generate(&self, key: &Fingerprint, date: Date) -> Result<DailyPool, AppError> {
        // The durable record decides whether today's pool already exists; a
        // failing durable tier degrades to regeneration.
        match self.durable.read(&Self::pool_path(date)).await {
            Ok(Some(record)) => match serde_json::from_value::<DailyPool>(record) {
                Ok(pool) => {
                    info!(%date, hotspots = pool.hotspots.len(), "daily pool found in durable tier");
                    self.cache_pool(key, &pool);
                    return Ok(pool);
                }
                Err(err) => {
                    warn!(%date, error = %err, "durable pool record undecodable, regenerating");
                }
            },
            Ok(None) => {}
            Err(err) => {
                warn!(%date, error = %err, "durable pool read failed, regenerating");
            }
        }

        let pool = self.generate_pool(date).await?;

        match serde_json::to_value(&pool) {
            Ok(record) => {
                if let Err(err) = self.durable.write(&Self::pool_path(date), record).await {
                    warn!(%date, error = %err, "failed to persist daily pool, serving from memory");
                }
            }
            Err(err) => warn!(%date, error = %err, "daily pool not serializable"),
        }
        self.cache_pool(key, &pool);
        Ok(pool)
    }

    fn cache_pool(&self, key: &Fingerprint, pool: &DailyPool) {
        if let Ok(value) = serde_json::to_value(pool) {
            self.cache.put_fast(key, value, self.pool_fast_ttl);
        }
    }

    /// Generates content for the day's selections.
    ///
    /// Selections run sequentially because the model is rate-limited.
    /// Partial failures are tolerated: the pool is the subset that
    /// succeeded, provided at least one did.
    async fn generate_pool(&self, date: Date) -> Result<DailyPool, AppError> {
        counter!("waypost_pool_generate_total").increment(1);
        let selections = select_for_date(date, CATALOG, self.hotspots_per_day);
        info!(%date, count = selections.len(), "generating daily hotspot pool");

        let mut hotspots = Vec::with_capacity(selections.len());
        let mut last_error: Option<AppError> = None;

        for (pool_index, destination) in selections.iter().enumerate() {
            match self.generate_hotspot(date, *destination, pool_index).await {
                Ok(hotspot) => hotspots.push(hotspot),
                Err(err) => {
                    if let AppError::Provider(provider_err) = &err
                        && provider_err.is_fatal()
                    {
                        return Err(err);
                    }
                    warn!(place = destination.place, error = %err, "hotspot generation failed, continuing");
                    last_error = Some(err);
                }
            }
        }

        if hotspots.is_empty() {
            return Err(last_error.unwrap_or_else(|| {
                AppError::Provider(ProviderError::unavailable("no hotspots generated"))
            }));
        }

        Ok(DailyPool {
            date,
            hotspots,
            generated_at: OffsetDateTime::now_utc(),
        })
    }

    async fn generate_hotspot(
        &self,
        date: Date,
        destination: Destination,
        pool_index: usize,
    ) -> Result<Hotspot, AppError> {
        let prompt = content_prompt(destination);
        let raw = match tokio::time::timeout(
            self.model_timeout,
            self.model.generate(&prompt, CONTENT_MAX_TOKENS),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(ProviderError::Timeout.into()),
        };

        let content = parse_content(&raw)?;
        Ok(Hotspot {
            date,
            place_name: destination.place.to_string(),
            region: destination.region.to_string(),
            pool_index,
            story: content.story,
            highlights: content.highlights,
            best_time_to_visit: content.best_time_to_visit,
            travel_tips: content.travel_tips,
            generated_at: OffsetDateTime::now_utc(),
        })
    }

    /// Deletes the durable record and fast-tier entry for a date, then
    /// regenerates the pool.
    #[instrument(skip(self))]
    pub async fn force_regenerate(&self, date: Date) -> Result<DailyPool, AppError> {
        let key = Self::pool_key(date);
        self.cache.invalidate_fast(&key);
        if let Err(err) = self.durable.delete(&Self::pool_path(date)).await {
            warn!(%date, error = %err, "failed to delete durable pool record before regeneration");
        }
        self.get_or_generate_pool(date).await
    }

    /// Pool fast-tier keys and their validity, for the admin surface.
    /// Entries other policies keep in the shared store are not reported.
    pub fn cache_info(&self) -> CacheReport {
        self.cache.report_scope(OPERATION)
    }

    /// Evicts one date's fast-tier entry, or every pool entry when no date
    /// is given. Other policies' entries in the shared store and the
    /// durable pool records are untouched either way; the latter are
    /// removed only by [`Self::force_regenerate`].
    pub fn clear_cache(&self, date: Option<Date>) {
        match date {
            Some(date) => self.cache.invalidate_fast(&Self::pool_key(date)),
            None => self.cache.clear_scope_fast(OPERATION),
        }
    }
}

fn content_prompt(destination: Destination) -> String {
    format!(
        "Create an engaging daily feature about \"{place}\" in \"{region}, Pakistan\". \
         Make it exciting and inspiring for travelers.\n\
         Your response MUST be a JSON object with exactly these keys: \
         \"story\" (2-3 captivating sentences, under 200 words), \
         \"highlights\" (array of exactly 3 highlights), \
         \"best_time_to_visit\" (short phrase such as \"April to October\"), \
         \"travel_tips\" (practical paragraph on transport, accommodation, and packing).",
        place = destination.place,
        region = destination.region,
    )
}

/// Extracts the outermost JSON object from model output. Models wrap the
/// object in prose often enough that a plain deserialize is not an option.
fn parse_content(raw: &str) -> Result<HotspotContent, ProviderError> {
    let start = raw
        .find('{')
        .ok_or_else(|| ProviderError::malformed("no JSON object in model output"))?;
    let end = raw
        .rfind('}')
        .ok_or_else(|| ProviderError::malformed("unterminated JSON object in model output"))?;
    if end < start {
        return Err(ProviderError::malformed("unterminated JSON object in model output"));
    }
    serde_json::from_str(&raw[start..=end])
        .map_err(|err| ProviderError::malformed(format!("model output not valid hotspot JSON: {err}")))
}
