#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;
pub mod workers;

use crate::adapters::database::DbPool;
use crate::adapters::database::delivery_repo::DeliveryRepository;
use crate::adapters::database::mailing_repo::MailingRepository;
use crate::adapters::database::message_repo::MessageRepository;
use crate::adapters::database::recipient_repo::RecipientRepository;
use crate::adapters::database::refresh_token_repo::RefreshTokenRepository;
use crate::adapters::database::user_repo::UserRepository;
use crate::adapters::mail::{LogMailTransport, MailTransport, SmtpMailTransport};
use crate::api::ServiceContainer;
use crate::config::{Config, MailConfig};
use crate::services::account_service::AccountService;
use crate::services::auth_service::AuthService;
use crate::services::delivery_service::DeliveryService;
use crate::services::health_service::HealthService;
use crate::services::lifecycle_service::LifecycleService;
use crate::services::mailing_service::MailingService;
use crate::services::message_service::MessageService;
use crate::services::rate_limit_service::RateLimitService;
use crate::services::recipient_service::RecipientService;
use crate::services::stats_service::StatsService;
use crate::services::user_service::UserService;
use crate::workers::MailingDispatchWorker;
use anyhow::Context;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Fully wired application: request-facing services plus background workers.
#[derive(Debug)]
pub struct App {
    pub services: ServiceContainer,
    pub health_service: HealthService,
    pub workers: Workers,
}

/// Background tasks started alongside the servers.
#[derive(Debug, Default)]
pub struct Workers {
    pub dispatch: Option<MailingDispatchWorker>,
}

impl Workers {
    #[must_use]
    pub fn spawn_all(self, shutdown_rx: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::new();
        if let Some(worker) = self.dispatch {
            tasks.push(tokio::spawn(worker.run(shutdown_rx)));
        }
        tasks
    }
}

/// Assembles repositories, services and workers from configuration and infrastructure.
#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    pool: Option<DbPool>,
    transport: Option<Arc<dyn MailTransport>>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, pool: None, transport: None }
    }

    #[must_use]
    pub fn with_database(mut self, pool: DbPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Overrides the transport chosen from the mail configuration.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn MailTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// # Errors
    /// Returns an error if no database pool was supplied or the SMTP transport cannot be built.
    pub fn build(self) -> anyhow::Result<App> {
        let config = self.config;
        let pool = self.pool.context("Database pool is required")?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => build_transport(&config.mail)?,
        };

        let user_repo = UserRepository::new();
        let refresh_repo = RefreshTokenRepository::new();
        let recipient_repo = RecipientRepository::new();
        let message_repo = MessageRepository::new();
        let mailing_repo = MailingRepository::new();
        let delivery_repo = DeliveryRepository::new();

        let auth_service = AuthService::new(config.auth.clone(), pool.clone(), user_repo.clone(), refresh_repo.clone());
        let account_service = AccountService::new(pool.clone(), user_repo.clone(), auth_service.clone());
        let user_service = UserService::new(pool.clone(), user_repo, refresh_repo, auth_service.clone());
        let recipient_service = RecipientService::new(pool.clone(), recipient_repo.clone());
        let message_service = MessageService::new(pool.clone(), message_repo.clone());

        let lifecycle = LifecycleService::new(
            pool.clone(),
            mailing_repo.clone(),
            message_repo.clone(),
            recipient_repo.clone(),
            delivery_repo.clone(),
            transport,
        );
        let mailing_service = MailingService::new(
            pool.clone(),
            mailing_repo.clone(),
            message_repo,
            recipient_repo.clone(),
            delivery_repo.clone(),
            lifecycle,
            config.mail.from_address.clone(),
        );
        let delivery_service = DeliveryService::new(pool.clone(), delivery_repo.clone(), mailing_repo.clone());
        let stats_service = StatsService::new(pool.clone(), mailing_repo, recipient_repo, delivery_repo);
        let rate_limit_service = RateLimitService::new(config.server.trusted_proxies.clone());
        let health_service = HealthService::new(pool, config.health.clone());

        let dispatch = config
            .dispatch
            .enabled
            .then(|| MailingDispatchWorker::new(mailing_service.clone(), config.dispatch.interval_secs));

        Ok(App {
            services: ServiceContainer {
                account_service,
                auth_service,
                user_service,
                recipient_service,
                message_service,
                mailing_service,
                delivery_service,
                stats_service,
                rate_limit_service,
            },
            health_service,
            workers: Workers { dispatch },
        })
    }
}

/// Relays through SMTP when a host is configured, otherwise logs outgoing mail.
///
/// # Errors
/// Returns an error if the SMTP relay cannot be configured.
pub fn build_transport(config: &MailConfig) -> anyhow::Result<Arc<dyn MailTransport>> {
    match &config.smtp_host {
        Some(host) => {
            tracing::info!(host = %host, port = config.smtp_port, "Using SMTP mail transport");
            Ok(Arc::new(SmtpMailTransport::new(host, config)?))
        }
        None => {
            tracing::warn!("No SMTP host configured, outgoing mail will only be logged");
            Ok(Arc::new(LogMailTransport))
        }
    }
}

/// Applies pending database migrations.
///
/// # Errors
/// Returns an error if a migration fails.
pub async fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    tracing::info!("Running database migrations...");
    sqlx::migrate!().run(pool).await.context("Failed to run database migrations")?;
    Ok(())
}

/// Flips the shutdown channel on SIGINT or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }

        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });
}

/// Routes panics through tracing so they reach the configured log sink.
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info.location().map(|l| format!("{}:{}", l.file(), l.line())).unwrap_or_default();
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        tracing::error!(location = %location, panic = %payload, "Application panicked");
    }));
}
