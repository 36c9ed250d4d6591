//! Periodic statistics polling and summary publishing.

use crate::{
    client::StatisticsSource,
    config::AggregatorConfig,
    dispatch::EventHandler,
    publisher::Publisher,
    stats::summarize,
    types::{AttendanceRecord, HttpReply, StatsSummary},
};
use chrono::Utc;
use eyre::{Result, WrapErr};
use tracing::{error, info, warn};

/// What a single tick ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Published(StatsSummary),
    /// The endpoint answered with a status other than 200.
    Rejected(HttpReply),
    /// Transport, parse or publish failure. Already logged.
    Failed,
}

/// Fetches attendance statistics on every tick and publishes a
/// [StatsSummary].
///
/// Ticks are independent: a failed tick leaves no state behind and the
/// next one runs on schedule.
pub struct StatsAggregator<S, P> {
    config: AggregatorConfig,
    source: S,
    publisher: P,
}

impl<S, P> StatsAggregator<S, P>
where
    S: StatisticsSource,
    P: Publisher,
{
    pub fn new(config: AggregatorConfig, source: S, publisher: P) -> Self {
        info!(
            api_endpoint = %config.api_endpoint,
            publish_rate = ?config.publish_rate,
            topic = %config.output_topic,
            "Creating StatsAggregator"
        );

        Self {
            config,
            source,
            publisher,
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub async fn tick(&mut self) -> TickOutcome {
        let reply = match self.source.fetch_statistics().await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %format_args!("{e:#}"), "Error fetching statistics");
                return TickOutcome::Failed;
            }
        };

        if reply.status != 200 {
            warn!(status = reply.status, body = %reply.body, "Statistics request failed");
            return TickOutcome::Rejected(reply);
        }

        match self.publish_summary(&reply.body) {
            Ok(summary) => {
                info!(
                    total_students = summary.total_students,
                    average_attendance = summary.average_attendance,
                    below_threshold = summary.below_threshold,
                    "Published attendance statistics"
                );
                TickOutcome::Published(summary)
            }
            Err(e) => {
                error!(error = %format_args!("{e:#}"), "Error publishing statistics");
                TickOutcome::Failed
            }
        }
    }

    fn publish_summary(&mut self, body: &str) -> Result<StatsSummary> {
        let records: Vec<AttendanceRecord> =
            serde_json::from_str(body).wrap_err("Malformed statistics response")?;

        let summary = summarize(&records, &self.config.policy, Utc::now());
        let payload = serde_json::to_string(&summary).wrap_err("Failed to serialize summary")?;

        self.publisher
            .publish(&self.config.output_topic, &payload)
            .wrap_err_with(|| format!("Failed to publish to '{}'", self.config.output_topic))?;

        Ok(summary)
    }
}

impl<S, P> EventHandler for StatsAggregator<S, P>
where
    S: StatisticsSource,
    P: Publisher,
{
    async fn on_tick(&mut self) {
        self.tick().await;
    }
}
