pub mod aggregate;
pub mod chunk;
pub mod dispatch;
pub mod fetch;
pub mod render;
pub mod sanitize;
pub mod window;

pub use aggregate::{CategoryReport, ChannelReport};
pub use render::RenderedReport;
pub use window::{compute_window, TimeWindow};

use crate::config::DigestSettings;
use crate::platform::{ChatPlatform, GuildLayout, PlatformError};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Run-ending conditions that stop a run before anything is posted.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Destination channel #{0} not found")]
    DestinationNotFound(String),
    #[error("No category name contains '{0}'")]
    NoMatchingCategory(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Failed to read guild layout: {0}")]
    Platform(#[from] PlatformError),
    #[error("Failed to write export: {0}")]
    Export(#[from] std::io::Error),
}

/// A collected and rendered report, not yet delivered.
#[derive(Debug, Clone)]
pub struct Digest {
    pub window: TimeWindow,
    /// Calendar date of the window end in the report time zone.
    pub date: NaiveDate,
    pub report: RenderedReport,
    pub message_count: usize,
    pub skipped_channels: Vec<String>,
}

impl Digest {
    pub fn file_name(&self) -> String {
        format!("summary_{}.md", self.date.format("%Y-%m-%d"))
    }

    /// Write the markdown document into `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, DigestError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.report.to_document())?;
        Ok(path)
    }
}

/// What a completed run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub window: TimeWindow,
    pub categories: usize,
    pub messages: usize,
    pub skipped_channels: Vec<String>,
    pub posts_delivered: usize,
    pub posts_failed: Vec<usize>,
}

/// The one digest pipeline: window, fetch, aggregate, render, chunk, dispatch.
/// Manual and scheduled triggers share a runner; runs never overlap.
pub struct DigestRunner {
    platform: Arc<dyn ChatPlatform>,
    settings: DigestSettings,
    run_lock: tokio::sync::Mutex<()>,
}

impl DigestRunner {
    pub fn new(platform: Arc<dyn ChatPlatform>, settings: DigestSettings) -> Self {
        Self {
            platform,
            settings,
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &DigestSettings {
        &self.settings
    }

    async fn collect_from<Tz>(
        &self,
        layout: &GuildLayout,
        window: TimeWindow,
        tz: Tz,
    ) -> Result<Digest, DigestError>
    where
        Tz: TimeZone + Send + Sync,
        Tz::Offset: Display + Send + Sync,
    {
        let categories = aggregate::team_categories(layout, &self.settings.category_marker);
        if categories.is_empty() {
            return Err(
                ConfigurationError::NoMatchingCategory(self.settings.category_marker.clone()).into(),
            );
        }

        let aggregation = aggregate::aggregate(
            self.platform.as_ref(),
            layout,
            &categories,
            &window,
            &self.settings,
        )
        .await;

        let message_count = aggregation.reports.iter().map(|r| r.message_count()).sum();
        let report = render::render_report(
            &aggregation.reports,
            &window,
            &tz,
            self.settings.content_cap,
        );
        Ok(Digest {
            window,
            date: window.end.with_timezone(&tz).date_naive(),
            report,
            message_count,
            skipped_channels: aggregation.skipped_channels,
        })
    }

    /// Collect and render the window ending at or before `now`, without posting.
    pub async fn collect_at<Tz>(&self, now: DateTime<Tz>) -> Result<Digest, DigestError>
    where
        Tz: TimeZone + Send + Sync,
        Tz::Offset: Display + Send + Sync,
    {
        let window = compute_window(&now, self.settings.boundary_hour);
        let tz = now.timezone();
        let layout = self.platform.layout().await?;
        self.collect_from(&layout, window, tz).await
    }

    /// Collect, render and post the report for the window ending at or before `now`.
    pub async fn run_at<Tz>(&self, now: DateTime<Tz>) -> Result<RunSummary, DigestError>
    where
        Tz: TimeZone + Send + Sync,
        Tz::Offset: Display + Send + Sync,
    {
        let _guard = self.run_lock.lock().await;

        let window = compute_window(&now, self.settings.boundary_hour);
        let tz = now.timezone();
        tracing::info!(
            "Summarizing {} ({} – {})",
            self.platform.name(),
            window.start,
            window.end
        );

        let layout = self.platform.layout().await?;
        let destination = layout
            .channels
            .iter()
            .filter(|c| c.name == self.settings.destination_channel)
            // Positions only order siblings; among same-named channels the oldest wins.
            .min_by_key(|c| c.id)
            .map(|c| c.id)
            .ok_or_else(|| {
                ConfigurationError::DestinationNotFound(self.settings.destination_channel.clone())
            })?;

        let digest = self.collect_from(&layout, window, tz).await?;
        let posts = digest.report.posts(self.settings.chunk_size);
        let outcome = dispatch::dispatch(
            self.platform.as_ref(),
            destination,
            &posts,
            self.settings.post_delay,
        )
        .await;

        Ok(RunSummary {
            window,
            categories: digest.report.sections.len(),
            messages: digest.message_count,
            skipped_channels: digest.skipped_channels,
            posts_delivered: outcome.delivered.len(),
            posts_failed: outcome.failed,
        })
    }

    /// [`run_at`](Self::run_at) for the instant `at`, seen in the configured zone.
    pub async fn run_for(&self, at: DateTime<Utc>) -> Result<RunSummary, DigestError> {
        match self.settings.timezone {
            Some(tz) => self.run_at(at.with_timezone(&tz)).await,
            None => self.run_at(at.with_timezone(&Local)).await,
        }
    }

    pub async fn run_now(&self) -> Result<RunSummary, DigestError> {
        self.run_for(Utc::now()).await
    }

    /// [`collect_at`](Self::collect_at) with the current time in the configured zone.
    pub async fn collect_now(&self) -> Result<Digest, DigestError> {
        match self.settings.timezone {
            Some(tz) => self.collect_at(Utc::now().with_timezone(&tz)).await,
            None => self.collect_at(Local::now()).await,
        }
    }

    /// Run for the instant `at` on a separate task and log the outcome.
    /// Errors and panics end only this run.
    pub async fn run_isolated(self: Arc<Self>, trigger: &str, at: DateTime<Utc>) {
        let handle = tokio::spawn(async move { self.run_for(at).await });
        match handle.await {
            Ok(Ok(summary)) => {
                tracing::info!(
                    "{} summary done: {} message(s) in {} categor(ies), {} post(s) delivered, {} failed, {} channel(s) skipped",
                    trigger,
                    summary.messages,
                    summary.categories,
                    summary.posts_delivered,
                    summary.posts_failed.len(),
                    summary.skipped_channels.len()
                );
            }
            Ok(Err(e)) => tracing::error!("{} summary failed: {}", trigger, e),
            Err(e) => tracing::error!("{} summary aborted: {}", trigger, e),
        }
    }
}
