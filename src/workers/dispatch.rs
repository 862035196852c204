use crate::services::mailing_service::{DispatchSummary, MailingService};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::Instrument;

/// Periodically sends every mailing whose window is open.
#[derive(Debug)]
pub struct MailingDispatchWorker {
    mailing_service: MailingService,
    interval_secs: u64,
}

impl MailingDispatchWorker {
    #[must_use]
    pub const fn new(mailing_service: MailingService, interval_secs: u64) -> Self {
        Self { mailing_service, interval_secs }
    }

    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        if self.interval_secs == 0 {
            tracing::info!("Mailing dispatch is disabled (interval = 0)");
            return;
        }

        // First run after one full period so restarts do not re-send open mailings.
        let period = Duration::from_secs(self.interval_secs);
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_once()
                        .instrument(tracing::info_span!("run_mailing_dispatch"))
                        .await
                    {
                        tracing::error!(error = %e, "Mailing dispatch iteration failed");
                    }
                }
                _ = shutdown.changed() => {}
            }
        }
        tracing::info!("Mailing dispatch loop shutting down...");
    }

    /// Sends all open mailings once.
    ///
    /// # Errors
    /// Returns an error if the open mailings cannot be loaded.
    #[tracing::instrument(skip(self), err, fields(mailings = tracing::field::Empty))]
    pub async fn run_once(&self) -> anyhow::Result<DispatchSummary> {
        tracing::debug!("Running mailing dispatch...");

        let summary = self.mailing_service.dispatch_open(OffsetDateTime::now_utc()).await?;

        tracing::Span::current().record("mailings", summary.mailings);
        if summary.mailings > 0 {
            tracing::info!(
                mailings = summary.mailings,
                sent = summary.sent,
                failed = summary.failed,
                errors = summary.errors,
                "Dispatched open mailings"
            );
        }

        Ok(summary)
    }
}
