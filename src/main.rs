//! Entry point: one budgeted poll/apply/publish cycle.
//!
//! The binary is designed to be invoked on a schedule (cron or a platform
//! trigger). Each run resumes from the persisted cursor, so repeated
//! invocations walk the channel exactly once.

use anyhow::Result;
use tracing::{info, info_span};

use league_schedule_bot::config;
use league_schedule_bot::logging;
use league_schedule_bot::metrics::Metrics;
use league_schedule_bot::poller::{PollBudget, Poller};
use league_schedule_bot::props::FileProps;
use league_schedule_bot::relay::DiscordRelay;
use league_schedule_bot::sheet::SheetsClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before any config/logging initialization so OnceLock-cached
    // getters see the file's values.
    dotenvy::dotenv().ok();

    // Keep the guard alive for the program lifetime so the non-blocking
    // writer flushes before exit.
    let _log_guard = logging::init_logging();
    let run_id = logging::get_run_id();

    let dry_run = config::dry_run();
    let channel_id = config::board_channel_id();
    let budget = PollBudget::from_env();

    let root_span = info_span!(
        "schedule_bot",
        run_id = %run_id,
        dry_run = dry_run,
        channel = %channel_id,
        max_messages = budget.max_messages,
    );
    let _enter = root_span.enter();

    info!("League Schedule Board Bot starting");
    if dry_run {
        info!("Mode: DRY RUN (no messages will be posted)");
    }

    let ops_channel = config::ops_log_channel_id();
    let relay = DiscordRelay::new(config::relay_token())?;
    let sheet = SheetsClient::new(config::sheet_id(), config::sheet_api_key())?;
    let props = FileProps::load_from(config::props_path());
    let metrics = Metrics::new();

    let poller = Poller {
        relay: &relay,
        sheet: &sheet,
        props: &props,
        metrics: &metrics,
        channel_id: &channel_id,
        ops_channel: &ops_channel,
        dry_run,
    };

    let outcome = poller.run_batch(&budget).await?;

    info!(
        stop_reason = ?outcome.stop_reason,
        processed = outcome.processed,
        failures = outcome.failures.len(),
        weeks = ?outcome.touched_weeks,
        "batch complete"
    );
    info!("{}", metrics.summary_line());
    Ok(())
}
