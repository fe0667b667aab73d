//! Publication reconciler.
//!
//! Keeps the live board messages in step with the rendered content while
//! never holding more than one message per role per week. All decisions key
//! off a content hash that ignores volatile countdown tokens, so a rerun
//! with unchanged data touches nothing.

use anyhow::Result;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::metrics::Metrics;
use crate::props::{PropsStore, PropsStoreExt};
use crate::relay::{is_not_found, ChatRelay};
use crate::render::RenderedBoard;
use crate::types::BoardRole;

fn volatile_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Relative-timestamp markup re-renders client-side every second; it must
    // not count as a content change.
    RE.get_or_init(|| Regex::new(r"<t:\d+:[a-zA-Z]>").unwrap())
}

/// Hash of the board content with volatile fragments removed.
pub fn stable_hash(content: &str) -> String {
    let stripped = volatile_re().replace_all(content, "<t>");
    let mut hasher = Sha256::new();
    hasher.update(stripped.as_bytes());
    hex::encode(hasher.finalize())
}

/// What happened to one role's message during a reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleOutcome {
    Created,
    Edited,
    Deleted,
    UpToDate,
}

impl fmt::Display for RoleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoleOutcome::Created => "created",
            RoleOutcome::Edited => "edited",
            RoleOutcome::Deleted => "deleted",
            RoleOutcome::UpToDate => "up-to-date",
        };
        f.write_str(s)
    }
}

/// Drives board messages toward the rendered content.
pub struct Reconciler<'a> {
    pub relay: &'a dyn ChatRelay,
    pub props: &'a dyn PropsStore,
    pub metrics: &'a Metrics,
    pub board_channel: &'a str,
    pub ops_channel: &'a str,
    pub dry_run: bool,
}

impl<'a> Reconciler<'a> {
    /// Reconcile all three roles for one week and post the aggregated
    /// notice when anything changed.
    pub async fn reconcile_week(
        &self,
        week_key: &str,
        board: &RenderedBoard,
    ) -> Result<Vec<(BoardRole, RoleOutcome)>> {
        let mut set = self.props.get_board(week_key);
        let mut outcomes = Vec::with_capacity(BoardRole::ALL.len());

        for role in BoardRole::ALL {
            let content = board.content_for(role);
            let result = self.reconcile_role(week_key, role, content, &mut set).await;
            // Ids claimed so far must survive a failure in a later role,
            // or the retry run posts duplicates.
            if !self.dry_run {
                self.props.put_board(week_key, &set)?;
            }
            outcomes.push((role, result?));
        }

        if outcomes.iter().any(|(_, o)| *o != RoleOutcome::UpToDate) {
            let notice = format!(
                "{} board: {}",
                week_key,
                outcomes
                    .iter()
                    .map(|(role, o)| format!("{} {}", role.as_str(), o))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            if self.dry_run {
                info!("dry-run notice: {}", notice);
            } else {
                self.relay.post_message(self.ops_channel, &notice).await?;
            }
        }
        Ok(outcomes)
    }

    async fn reconcile_role(
        &self,
        week_key: &str,
        role: BoardRole,
        content: &str,
        set: &mut crate::types::PublishedMessageSet,
    ) -> Result<RoleOutcome> {
        let stored_id = set.message_id(role).map(str::to_string);

        if content.is_empty() {
            return match stored_id {
                Some(id) => {
                    if !self.dry_run {
                        self.relay.delete_message(self.board_channel, &id).await?;
                    }
                    // Hash stays behind for audit; only the id is cleared.
                    set.set_message_id(role, None);
                    self.metrics.publishes_deleted.increment();
                    info!(week_key, role = role.as_str(), "board message deleted");
                    Ok(RoleOutcome::Deleted)
                }
                None => {
                    self.metrics.publishes_noop.increment();
                    Ok(RoleOutcome::UpToDate)
                }
            };
        }

        let new_hash = stable_hash(content);

        let Some(id) = stored_id else {
            if !self.dry_run {
                let id = self.relay.post_message(self.board_channel, content).await?;
                set.set_message_id(role, Some(id));
            }
            set.set_hash(role, Some(new_hash));
            self.metrics.publishes_created.increment();
            info!(week_key, role = role.as_str(), "board message created");
            return Ok(RoleOutcome::Created);
        };

        if set.hash(role) == Some(new_hash.as_str()) {
            self.metrics.publishes_noop.increment();
            return Ok(RoleOutcome::UpToDate);
        }

        if self.dry_run {
            set.set_hash(role, Some(new_hash));
            self.metrics.publishes_edited.increment();
            return Ok(RoleOutcome::Edited);
        }

        match self.relay.edit_message(self.board_channel, &id, content).await {
            Ok(_) => {
                set.set_hash(role, Some(new_hash));
                self.metrics.publishes_edited.increment();
                info!(week_key, role = role.as_str(), "board message edited");
                Ok(RoleOutcome::Edited)
            }
            Err(err) if is_not_found(&err) => {
                // Someone deleted the live message; recreate instead of
                // failing the whole publish.
                warn!(
                    week_key,
                    role = role.as_str(),
                    "stored message gone upstream, recreating"
                );
                let id = self.relay.post_message(self.board_channel, content).await?;
                set.set_message_id(role, Some(id));
                set.set_hash(role, Some(new_hash));
                self.metrics.publishes_created.increment();
                Ok(RoleOutcome::Created)
            }
            Err(err) => {
                self.metrics.relay_errors.increment();
                Err(err)
            }
        }
    }
}
