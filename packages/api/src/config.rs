//! Monitor configuration.

use std::time::Duration;

use actors::HubSettings;
use engine::DbConfig;
use services::{JobMutationService, JobQueryService};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("no queues configured")]
    NoQueues,
}

/// Everything needed to bring a monitor up.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Queues to register at startup.
    pub queues: Vec<String>,
    /// Minimum spacing between two broadcasts for the same queue.
    pub throttle: Duration,
    /// Items younger than this survive a bulk clear.
    pub clean_grace: Duration,
    /// Largest page size a caller may request.
    pub max_page_size: u64,
    /// Upper bound on a single engine call.
    pub engine_timeout: Duration,
    /// Events buffered per connection.
    pub subscriber_buffer: usize,
    /// Where the SurrealDB engine keeps its items.
    pub db: DbConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            queues: vec!["default".to_string()],
            throttle: HubSettings::DEFAULT_THROTTLE,
            clean_grace: JobMutationService::DEFAULT_CLEAN_GRACE,
            max_page_size: JobQueryService::DEFAULT_MAX_PAGE_SIZE,
            engine_timeout: JobQueryService::DEFAULT_TIMEOUT,
            subscriber_buffer: HubSettings::DEFAULT_BUFFER,
            db: DbConfig::memory(),
        }
    }
}

impl MonitorConfig {
    /// Read configuration from `MONITOR_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults for absent keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(queues) = lookup("MONITOR_QUEUES") {
            config.queues = queues
                .split(',')
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string)
                .collect();
            if config.queues.is_empty() {
                return Err(ConfigError::NoQueues);
            }
        }
        if let Some(ms) = lookup("MONITOR_THROTTLE_MS") {
            config.throttle = Duration::from_millis(parse("MONITOR_THROTTLE_MS", &ms)?);
        }
        if let Some(ms) = lookup("MONITOR_CLEAN_GRACE_MS") {
            config.clean_grace = Duration::from_millis(parse("MONITOR_CLEAN_GRACE_MS", &ms)?);
        }
        if let Some(size) = lookup("MONITOR_MAX_PAGE_SIZE") {
            config.max_page_size = parse("MONITOR_MAX_PAGE_SIZE", &size)?;
        }
        if let Some(ms) = lookup("MONITOR_ENGINE_TIMEOUT_MS") {
            config.engine_timeout =
                Duration::from_millis(parse("MONITOR_ENGINE_TIMEOUT_MS", &ms)?);
        }
        if let Some(size) = lookup("MONITOR_SUBSCRIBER_BUFFER") {
            config.subscriber_buffer = parse("MONITOR_SUBSCRIBER_BUFFER", &size)?;
        }

        if let Some(endpoint) = lookup("MONITOR_DB_ENDPOINT") {
            config.db = config.db.with_endpoint(endpoint);
        }
        if let Some(namespace) = lookup("MONITOR_DB_NAMESPACE") {
            config.db = config.db.with_namespace(namespace);
        }
        if let Some(database) = lookup("MONITOR_DB_DATABASE") {
            config.db = config.db.with_database(database);
        }

        match (lookup("MONITOR_DB_USER"), lookup("MONITOR_DB_PASS")) {
            (Some(user), Some(pass)) => config.db = config.db.with_credentials(user, pass),
            (None, None) => {}
            (Some(_), None) => {
                return Err(invalid("MONITOR_DB_PASS", "", "required with MONITOR_DB_USER"));
            }
            (None, Some(_)) => {
                return Err(invalid("MONITOR_DB_USER", "", "required with MONITOR_DB_PASS"));
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but make no sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queues.is_empty() {
            return Err(ConfigError::NoQueues);
        }
        if self.max_page_size == 0 {
            return Err(invalid("MONITOR_MAX_PAGE_SIZE", "0", "must be positive"));
        }
        if self.subscriber_buffer == 0 {
            return Err(invalid("MONITOR_SUBSCRIBER_BUFFER", "0", "must be positive"));
        }
        if self.engine_timeout.is_zero() {
            return Err(invalid("MONITOR_ENGINE_TIMEOUT_MS", "0", "must be positive"));
        }
        Ok(())
    }

    pub fn with_queues<I, S>(mut self, queues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queues = queues.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_clean_grace(mut self, grace: Duration) -> Self {
        self.clean_grace = grace;
        self
    }

    pub fn with_max_page_size(mut self, max_page_size: u64) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    pub fn with_engine_timeout(mut self, timeout: Duration) -> Self {
        self.engine_timeout = timeout;
        self
    }

    pub fn with_subscriber_buffer(mut self, buffer: usize) -> Self {
        self.subscriber_buffer = buffer;
        self
    }

    pub fn with_db(mut self, db: DbConfig) -> Self {
        self.db = db;
        self
    }

    /// Hub settings derived from this configuration.
    pub fn hub_settings(&self) -> HubSettings {
        HubSettings::default()
            .with_throttle(self.throttle)
            .with_buffer(self.subscriber_buffer)
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, value, &e.to_string()))
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
