use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{DistanceBands, MatchingPolicy, ScoringWeights, SkillWeights};
use crate::services::{BatchOptions, CacheOptions, PoolOptions, ServiceOptions};

const ENV_PREFIX: &str = "INTERNMATCH";

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub batch: BatchSettings,
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Without a URL the service runs on the in-memory store
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

impl DatabaseSettings {
    pub fn pool_options(&self) -> PoolOptions {
        let defaults = PoolOptions::default();
        PoolOptions {
            max_connections: self.max_connections.unwrap_or(defaults.max_connections),
            min_connections: self.min_connections.unwrap_or(defaults.min_connections),
            acquire_timeout: self
                .acquire_timeout_secs
                .map_or(defaults.acquire_timeout, Duration::from_secs),
            idle_timeout: self
                .idle_timeout_secs
                .map_or(defaults.idle_timeout, Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub capacity: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_ttl() -> u64 { 300 }
fn default_cache_capacity() -> u64 { 10_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_max_distance")]
    pub max_distance_km: f64,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_similar_limit")]
    pub default_similar_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    #[serde(default = "default_max_skills")]
    pub max_skills: usize,
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    #[serde(default = "default_full_credit")]
    pub full_credit_km: f64,
    #[serde(default = "default_local_cutoff")]
    pub local_cutoff_km: f64,
    #[serde(default = "default_state_cutoff")]
    pub state_cutoff_km: f64,
    #[serde(default = "default_hard_filter_factor")]
    pub local_hard_filter_factor: f64,
    #[serde(default = "default_stipend_tolerance")]
    pub stipend_shortfall_tolerance: f64,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            max_distance_km: default_max_distance(),
            default_limit: default_limit(),
            default_similar_limit: default_similar_limit(),
            max_limit: default_max_limit(),
            max_skills: default_max_skills(),
            fuzzy_threshold: default_fuzzy_threshold(),
            full_credit_km: default_full_credit(),
            local_cutoff_km: default_local_cutoff(),
            state_cutoff_km: default_state_cutoff(),
            local_hard_filter_factor: default_hard_filter_factor(),
            stipend_shortfall_tolerance: default_stipend_tolerance(),
        }
    }
}

fn default_max_distance() -> f64 { 500.0 }
fn default_limit() -> usize { 5 }
fn default_similar_limit() -> usize { 10 }
fn default_max_limit() -> usize { 20 }
fn default_max_skills() -> usize { 50 }
fn default_fuzzy_threshold() -> f64 { 0.88 }
fn default_full_credit() -> f64 { 10.0 }
fn default_local_cutoff() -> f64 { 50.0 }
fn default_state_cutoff() -> f64 { 200.0 }
fn default_hard_filter_factor() -> f64 { 2.0 }
fn default_stipend_tolerance() -> f64 { 0.2 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
    #[serde(default)]
    pub skill_weights: SkillWeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_skill_weight")]
    pub skill: f64,
    #[serde(default = "default_distance_weight")]
    pub distance: f64,
    #[serde(default = "default_preference_weight")]
    pub preference: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            skill: default_skill_weight(),
            distance: default_distance_weight(),
            preference: default_preference_weight(),
        }
    }
}

fn default_skill_weight() -> f64 { 0.5 }
fn default_distance_weight() -> f64 { 0.3 }
fn default_preference_weight() -> f64 { 0.2 }

#[derive(Debug, Clone, Deserialize)]
pub struct SkillWeightsConfig {
    #[serde(default = "default_exact_weight")]
    pub exact: f64,
    #[serde(default = "default_fuzzy_weight")]
    pub fuzzy: f64,
    #[serde(default = "default_related_weight")]
    pub related: f64,
}

impl Default for SkillWeightsConfig {
    fn default() -> Self {
        Self {
            exact: default_exact_weight(),
            fuzzy: default_fuzzy_weight(),
            related: default_related_weight(),
        }
    }
}

fn default_exact_weight() -> f64 { 1.0 }
fn default_fuzzy_weight() -> f64 { 0.7 }
fn default_related_weight() -> f64 { 0.5 }

#[derive(Debug, Clone, Deserialize)]
pub struct BatchSettings {
    #[serde(default = "default_batch_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_batch_max_size")]
    pub max_size: usize,
    pub timeout_ms: Option<u64>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            concurrency: default_batch_concurrency(),
            max_size: default_batch_max_size(),
            timeout_ms: None,
        }
    }
}

fn default_batch_concurrency() -> usize { 5 }
fn default_batch_max_size() -> usize { 50 }

/// Optional JSON dataset loaded into the store at startup
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataSettings {
    pub seed_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration files (config/default.toml, config/local.toml)
    /// 3. Environment variables (prefixed with INTERNMATCH__)
    /// 4. DATABASE_URL
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Development overrides
            .add_source(File::with_name("config/local").required(false));

        Self::finish(builder)
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::finish(Config::builder().add_source(File::from(path.as_ref())))
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        // e.g., INTERNMATCH__BATCH__CONCURRENCY -> batch.concurrency
        let mut builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        if let Ok(url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let weights = &self.scoring.weights;
        let sum = weights.skill + weights.distance + weights.preference;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::Message(format!(
                "scoring weights must sum to 1.0, got {}",
                sum
            )));
        }
        if self.matching.max_limit == 0 || self.batch.max_size == 0 {
            return Err(ConfigError::Message(
                "matching.max_limit and batch.max_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Immutable policy handed to the engine at construction
    pub fn matching_policy(&self) -> MatchingPolicy {
        let m = &self.matching;
        let s = &self.scoring;

        MatchingPolicy {
            weights: ScoringWeights {
                skill: s.weights.skill,
                distance: s.weights.distance,
                preference: s.weights.preference,
            },
            skill_weights: SkillWeights {
                exact: s.skill_weights.exact,
                fuzzy: s.skill_weights.fuzzy,
                related: s.skill_weights.related,
            },
            distance: DistanceBands {
                full_credit_km: m.full_credit_km,
                local_km: m.local_cutoff_km,
                state_km: m.state_cutoff_km,
                max_distance_km: m.max_distance_km,
                local_hard_filter_factor: m.local_hard_filter_factor,
            },
            fuzzy_threshold: m.fuzzy_threshold,
            max_skills: m.max_skills,
            max_limit: m.max_limit,
            stipend_shortfall_tolerance: m.stipend_shortfall_tolerance,
        }
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            default_limit: self.matching.default_limit,
            default_similar_limit: self.matching.default_similar_limit,
            cache: CacheOptions {
                ttl: Duration::from_secs(self.cache.ttl_secs),
                capacity: self.cache.capacity,
            },
            batch: BatchOptions {
                concurrency: self.batch.concurrency,
                max_size: self.batch.max_size,
                timeout: self.batch.timeout_ms.map(Duration::from_millis),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_policy_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.matching_policy(), MatchingPolicy::default());

        let options = settings.service_options();
        assert_eq!(options.default_limit, 5);
        assert_eq!(options.batch.concurrency, 5);
        assert_eq!(options.batch.max_size, 50);
        assert!(options.batch.timeout.is_none());
        assert_eq!(options.cache.ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut settings = Settings::default();
        settings.scoring.weights.skill = 0.9;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_toml() {
        let path = std::env::temp_dir().join(format!("internmatch-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "[batch]\nconcurrency = 8\ntimeout_ms = 2500\n\n[matching]\nmax_distance_km = 300.0\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.batch.concurrency, 8);
        assert_eq!(settings.service_options().batch.timeout, Some(Duration::from_millis(2500)));
        assert_eq!(settings.matching_policy().distance.max_distance_km, 300.0);
        assert_eq!(settings.cache.ttl_secs, 300);
    }

    #[test]
    fn test_pool_options_defaults() {
        let options = DatabaseSettings {
            max_connections: Some(4),
            ..DatabaseSettings::default()
        }
        .pool_options();
        assert_eq!(options.max_connections, 4);
        assert_eq!(options.min_connections, 1);
    }
}
