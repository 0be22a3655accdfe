//! Application configuration loaded from environment variables.

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Consumer settings for one participant result stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    pub group_id: String,
    pub topic: String,
}

/// Message broker settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaConfig {
    pub bootstrap_servers: String,
    pub room_booking: StreamConfig,
    pub payment: StreamConfig,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:29092".to_string(),
            room_booking: StreamConfig {
                group_id: "reservation-service-rb".to_string(),
                topic: "room-booking.outbox.events".to_string(),
            },
            payment: StreamConfig {
                group_id: "reservation-service-p".to_string(),
                topic: "payment.outbox.events".to_string(),
            },
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `8080`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory store when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `SAGA_OPTIMISTIC_LOCKING`: version-checked saga updates (default: `false`)
/// - `SAGA_IGNORE_TERMINATED_RESULTS`: only consume results for terminated
///   sagas (default: `false`)
/// - `KAFKA_BOOTSTRAP_SERVERS`, `ROOM_BOOKING_GROUP_ID`, `ROOM_BOOKING_TOPIC`,
///   `PAYMENT_GROUP_ID`, `PAYMENT_TOPIC`: result stream subscriptions
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub optimistic_locking: bool,
    pub ignore_terminated_results: bool,
    pub kafka: KafkaConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let kafka = defaults.kafka.clone();
        let string = |key: &str, default: String| lookup(key).unwrap_or(default);
        let flag = |key: &str, default: bool| {
            lookup(key)
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(default)
        };

        Self {
            host: string("HOST", defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: string("RUST_LOG", defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or_default(),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.database_max_connections),
            optimistic_locking: flag("SAGA_OPTIMISTIC_LOCKING", defaults.optimistic_locking),
            ignore_terminated_results: flag(
                "SAGA_IGNORE_TERMINATED_RESULTS",
                defaults.ignore_terminated_results,
            ),
            kafka: KafkaConfig {
                bootstrap_servers: string("KAFKA_BOOTSTRAP_SERVERS", kafka.bootstrap_servers),
                room_booking: StreamConfig {
                    group_id: string("ROOM_BOOKING_GROUP_ID", kafka.room_booking.group_id),
                    topic: string("ROOM_BOOKING_TOPIC", kafka.room_booking.topic),
                },
                payment: StreamConfig {
                    group_id: string("PAYMENT_GROUP_ID", kafka.payment.group_id),
                    topic: string("PAYMENT_TOPIC", kafka.payment.topic),
                },
            },
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 5,
            optimistic_locking: false,
            ignore_terminated_results: false,
            kafka: KafkaConfig::default(),
        }
    }
}
