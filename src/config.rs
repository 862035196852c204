use clap::{Args, Parser, Subcommand, ValueEnum};
use ipnetwork::IpNetwork;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub auth: AuthConfig,

    #[command(flatten)]
    pub rate_limit: RateLimitConfig,

    #[command(flatten)]
    pub mail: MailConfig,

    #[command(flatten)]
    pub dispatch: DispatchConfig,

    #[command(flatten)]
    pub health: HealthConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API, the management server and the dispatch worker (default)
    Serve,

    /// Send every mailing whose window is currently open, then exit
    Dispatch,

    /// Create (or reset) a staff account holding every permission
    CreateAdmin {
        #[arg(long, default_value = "admin")]
        username: String,

        #[arg(long, default_value = "admin@example.com")]
        email: String,

        #[arg(long, env = "MAILING_ADMIN_PASSWORD")]
        password: String,
    },

    /// Grant a named role to an existing user
    GrantRole {
        #[arg(long)]
        username: String,

        #[arg(long, default_value = "managers")]
        role: String,
    },
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "MAILING_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "MAILING_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for the management server (health probes)
    #[arg(long, env = "MAILING_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// Seconds to wait for background workers during shutdown
    #[arg(long, env = "MAILING_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,

    /// Comma-separated list of CIDRs to trust for X-Forwarded-For IP extraction
    #[arg(
        long,
        env = "MAILING_TRUSTED_PROXIES",
        default_value = "10.0.0.0/8,172.16.0.0/12,192.168.0.0/16,127.0.0.1/32",
        value_delimiter = ','
    )]
    pub trusted_proxies: Vec<IpNetwork>,
}

#[derive(Clone, Debug, Args)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[arg(long = "database-url", env = "MAILING_DATABASE_URL")]
    pub url: String,

    #[arg(long, env = "MAILING_DB_MAX_CONNECTIONS", default_value_t = 20)]
    pub max_connections: u32,

    #[arg(long, env = "MAILING_DB_MIN_CONNECTIONS", default_value_t = 2)]
    pub min_connections: u32,

    #[arg(long, env = "MAILING_DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 5)]
    pub acquire_timeout_secs: u64,

    #[arg(long, env = "MAILING_DB_IDLE_TIMEOUT_SECS", default_value_t = 600)]
    pub idle_timeout_secs: u64,

    #[arg(long, env = "MAILING_DB_MAX_LIFETIME_SECS", default_value_t = 1800)]
    pub max_lifetime_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct AuthConfig {
    /// Secret key for JWT signing
    #[arg(long, env = "MAILING_JWT_SECRET")]
    pub jwt_secret: String,

    /// Access token time-to-live in seconds
    #[arg(long, env = "MAILING_ACCESS_TOKEN_TTL_SECS", default_value_t = 900)]
    pub access_token_ttl_secs: u64,

    /// Refresh token time-to-live in days
    #[arg(long, env = "MAILING_REFRESH_TOKEN_TTL_DAYS", default_value_t = 30)]
    pub refresh_token_ttl_days: i64,
}

#[derive(Clone, Debug, Args)]
pub struct RateLimitConfig {
    /// Requests per second allowed for register/login
    #[arg(long, env = "MAILING_AUTH_RATE_LIMIT_PER_SECOND", default_value_t = 1)]
    pub auth_per_second: u32,

    /// Burst allowance for register/login
    #[arg(long, env = "MAILING_AUTH_RATE_LIMIT_BURST", default_value_t = 3)]
    pub auth_burst: u32,
}

#[derive(Clone, Debug, Args)]
pub struct MailConfig {
    /// Sender address used for mailings
    #[arg(long, env = "MAILING_FROM_ADDRESS", default_value = "noreply@localhost")]
    pub from_address: String,

    /// SMTP relay host. When unset, outgoing mail is only logged.
    #[arg(long, env = "MAILING_SMTP_HOST")]
    pub smtp_host: Option<String>,

    #[arg(long, env = "MAILING_SMTP_PORT", default_value_t = 587)]
    pub smtp_port: u16,

    #[arg(long, env = "MAILING_SMTP_USERNAME")]
    pub smtp_username: Option<String>,

    #[arg(long, env = "MAILING_SMTP_PASSWORD")]
    pub smtp_password: Option<String>,

    /// Per-message SMTP timeout
    #[arg(long, env = "MAILING_SMTP_TIMEOUT_SECS", default_value_t = 20)]
    pub smtp_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct DispatchConfig {
    /// Run the periodic dispatch worker alongside the API
    #[arg(long = "dispatch-enabled", env = "MAILING_DISPATCH_ENABLED", default_value_t = true, action = clap::ArgAction::Set)]
    pub enabled: bool,

    /// How often the dispatch worker sends all open mailings
    #[arg(long = "dispatch-interval-secs", env = "MAILING_DISPATCH_INTERVAL_SECS", default_value_t = 3600)]
    pub interval_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct HealthConfig {
    /// Timeout for the database readiness check
    #[arg(long, env = "MAILING_HEALTH_DB_TIMEOUT_MS", default_value_t = 2000)]
    pub db_timeout_ms: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// OTLP collector endpoint. Tracing and metrics export is disabled when unset.
    #[arg(long, env = "MAILING_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    #[arg(long, env = "MAILING_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Interval between metric exports
    #[arg(long, env = "MAILING_METRICS_EXPORT_INTERVAL_SECS", default_value_t = 60)]
    pub metrics_export_interval_secs: u64,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: [&str; 5] = ["mailing-server", "--database-url", "postgres://localhost/mailing", "--jwt-secret", "s"];

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(BASE).unwrap();
        assert!(config.command.is_none());
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.dispatch.interval_secs, 3600);
        assert!(config.dispatch.enabled);
        assert!(config.mail.smtp_host.is_none());
        assert_eq!(config.telemetry.log_format, LogFormat::Text);
    }

    #[test]
    fn test_dispatch_subcommand() {
        let args = BASE.iter().copied().chain(["dispatch"]);
        let config = Config::try_parse_from(args).unwrap();
        assert!(matches!(config.command, Some(Command::Dispatch)));
    }

    #[test]
    fn test_disable_worker_flag() {
        let args = BASE.iter().copied().chain(["--dispatch-enabled", "false"]);
        let config = Config::try_parse_from(args).unwrap();
        assert!(!config.dispatch.enabled);
    }
}
