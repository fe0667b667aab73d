//! Budgeted message polling.
//!
//! The host environment imposes a hard wall-clock ceiling, so a batch never
//! assumes it can finish: budgets are checked before every page and before
//! every message, the cursor is persisted as it advances, and a clean stop
//! reason tells the caller whether to resume immediately or wait for the
//! next cycle.

use anyhow::Result;
use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::apply::apply_pair;
use crate::config::{self, FETCH_PAGE_SIZE};
use crate::error::ParseError;
use crate::interpret::temporal::EASTERN;
use crate::interpret::{run_pipeline, BatchCache};
use crate::metrics::Metrics;
use crate::props::{PropsStore, PropsStoreExt};
use crate::publish::Reconciler;
use crate::relay::ChatRelay;
use crate::render::render_week;
use crate::sheet::ScheduleSheet;
use crate::types::{ChatMessage, Division, WeekBlock};

/// Per-batch processing limits.
#[derive(Debug, Clone, Copy)]
pub struct PollBudget {
    pub max_messages: usize,
    pub max_elapsed: Duration,
}

impl PollBudget {
    pub fn from_env() -> Self {
        Self {
            max_messages: config::poll_max_messages(),
            max_elapsed: Duration::from_secs(config::poll_max_elapsed_secs()),
        }
    }
}

/// Why a batch stopped walking messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No messages left after the cursor.
    Drained,
    /// Message budget exhausted; more messages may be waiting.
    MessageBudget,
    /// Wall-clock budget exhausted; resume from the persisted cursor.
    TimeBudget,
}

/// Result of one batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    pub stop_reason: StopReason,
    pub processed: usize,
    /// (message id, reason code) for every recovered per-message failure.
    pub failures: Vec<(String, String)>,
    pub touched_weeks: Vec<String>,
}

/// Reason code for a recovered per-message failure.
fn reason_code(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<ParseError>() {
        Some(parse) => parse.reason_code(),
        None => "relay_http_error",
    }
}

/// One poll/apply/publish cycle over a channel.
pub struct Poller<'a> {
    pub relay: &'a dyn ChatRelay,
    pub sheet: &'a dyn ScheduleSheet,
    pub props: &'a dyn PropsStore,
    pub metrics: &'a Metrics,
    pub channel_id: &'a str,
    pub ops_channel: &'a str,
    pub dry_run: bool,
}

impl Poller<'_> {
    pub async fn run_batch(&self, budget: &PollBudget) -> Result<BatchOutcome> {
        let started = Instant::now();
        // Lookup state is never carried across batches.
        let cache = BatchCache::load(self.sheet).await?;

        let mut cursor = self.props.get_cursor(self.channel_id);
        let bootstrap = cursor.is_none();
        if bootstrap {
            info!(channel = self.channel_id, "no cursor, starting from latest page");
        }

        let mut processed = 0usize;
        let mut failures: Vec<(String, String)> = Vec::new();
        // Weeks a previous run wrote but never finished publishing come
        // first, so an interrupted publish is retried even when no new
        // message touches those weeks.
        let mut touched_weeks: Vec<String> = self.props.get_pending_weeks();
        if !touched_weeks.is_empty() {
            info!(
                count = touched_weeks.len(),
                "resuming weeks with an unfinished publish"
            );
        }
        let mut stop_reason = StopReason::Drained;

        'pages: loop {
            if started.elapsed() >= budget.max_elapsed {
                stop_reason = StopReason::TimeBudget;
                break;
            }
            if processed >= budget.max_messages {
                stop_reason = StopReason::MessageBudget;
                break;
            }

            let mut page = self
                .relay
                .fetch_messages(self.channel_id, cursor.as_deref(), FETCH_PAGE_SIZE)
                .await?;
            if page.is_empty() {
                break;
            }
            // Pages may come back reverse-chronological.
            page.sort_by_key(ChatMessage::snowflake);

            for msg in &page {
                if started.elapsed() >= budget.max_elapsed {
                    warn!(
                        message_id = %msg.id,
                        reason = ParseError::TimeoutPrevention.reason_code(),
                        "stopping mid-page, remaining messages deferred"
                    );
                    stop_reason = StopReason::TimeBudget;
                    break 'pages;
                }
                if processed >= budget.max_messages {
                    stop_reason = StopReason::MessageBudget;
                    break 'pages;
                }

                let touched_before = touched_weeks.len();
                self.process_message(msg, &cache, &mut failures, &mut touched_weeks)
                    .await;
                // A week becomes pending the moment its store changes; it
                // stays pending until its board is reconciled.
                if touched_weeks.len() > touched_before {
                    self.props.put_pending_weeks(&touched_weeks)?;
                }
                processed += 1;
                cursor = Some(msg.id.clone());
            }

            self.props.put_cursor(self.channel_id, page.last().unwrap().id.as_str())?;
            cursor = Some(page.last().unwrap().id.clone());

            // A bootstrap run only takes the most recent page.
            if bootstrap || page.len() < FETCH_PAGE_SIZE {
                break;
            }
        }

        // Persist mid-page progress so deferred messages are re-fetched.
        if let Some(id) = &cursor {
            self.props.put_cursor(self.channel_id, id)?;
        }

        self.publish_touched(&cache, &touched_weeks).await?;

        if processed > 0 || !failures.is_empty() {
            let summary = format!(
                "batch done: stop={:?} {}",
                stop_reason,
                self.metrics.summary_line()
            );
            info!("{}", summary);
            if !self.dry_run {
                self.relay.post_message(self.ops_channel, &summary).await?;
            }
        }

        Ok(BatchOutcome {
            stop_reason,
            processed,
            failures,
            touched_weeks,
        })
    }

    async fn process_message(
        &self,
        msg: &ChatMessage,
        cache: &BatchCache,
        failures: &mut Vec<(String, String)>,
        touched_weeks: &mut Vec<String>,
    ) {
        self.metrics.messages_processed.increment();
        let pairs = match run_pipeline(msg, cache) {
            Ok(pairs) => pairs,
            Err(err) => {
                // Most channel chatter is not a scheduling message at all.
                if !matches!(err, ParseError::NoVs) {
                    warn!(message_id = %msg.id, reason = err.reason_code(), error = %err, "message not interpreted");
                    self.metrics.parse_failures.increment();
                    failures.push((msg.id.clone(), err.reason_code().to_string()));
                }
                return;
            }
        };

        for pair in &pairs {
            match apply_pair(pair, self.sheet, self.props).await {
                Ok(_) => {
                    self.metrics.pairs_applied.increment();
                    if !touched_weeks.contains(&pair.week_key) {
                        touched_weeks.push(pair.week_key.clone());
                    }
                }
                Err(err) => {
                    warn!(
                        message_id = %msg.id,
                        week_key = %pair.week_key,
                        reason = reason_code(&err),
                        error = %err,
                        "update not applied"
                    );
                    self.metrics.parse_failures.increment();
                    failures.push((msg.id.clone(), reason_code(&err).to_string()));
                }
            }
        }
    }

    /// Re-render and reconcile every week a batch touched. Runs after the
    /// walk so each week publishes once per batch no matter how many
    /// messages hit it.
    async fn publish_touched(&self, cache: &BatchCache, touched_weeks: &[String]) -> Result<()> {
        if touched_weeks.is_empty() {
            return Ok(());
        }

        let all_blocks: Vec<WeekBlock> = Division::ALL
            .iter()
            .flat_map(|d| cache.weeks(*d).iter().cloned())
            .collect();
        let today = Utc::now().with_timezone(&EASTERN).date_naive();

        let reconciler = Reconciler {
            relay: self.relay,
            props: self.props,
            metrics: self.metrics,
            board_channel: self.channel_id,
            ops_channel: self.ops_channel,
            dry_run: self.dry_run,
        };

        let mut remaining = touched_weeks.to_vec();
        for week_key in touched_weeks {
            let Some(block) = all_blocks.iter().find(|b| b.week_key() == *week_key) else {
                warn!(week_key = %week_key, "touched week no longer in the grid, skipping publish");
                remaining.retain(|w| w != week_key);
                self.props.put_pending_weeks(&remaining)?;
                continue;
            };
            let store = self.props.get_week_store(week_key);
            let board = render_week(block, &store, &all_blocks, today);
            reconciler.reconcile_week(week_key, &board).await?;
            remaining.retain(|w| w != week_key);
            self.props.put_pending_weeks(&remaining)?;
        }
        Ok(())
    }
}
