//! Cloneable façade for issuing commands to the runtime.
//!
//! [`RuntimeHandle`] hides channel plumbing and offers async helpers for
//! clicking, managing effects and persisting the session.

use tokio::sync::{broadcast, mpsc, oneshot};

use game_core::{
    ApplyOutcome, ClickOutcome, EffectId, HitInput, ResourceKind, SessionSnapshot, SessionStatus,
};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::workers::Command;

/// Client-facing handle to interact with the runtime
#[derive(Clone)]
pub struct RuntimeHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl RuntimeHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, event_bus: EventBus) -> Self {
        Self {
            command_tx,
            event_bus,
        }
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Resolve a raw input event at the session's current time.
    pub async fn click(&self, input: HitInput) -> Result<ClickOutcome> {
        self.request(|reply| Command::Click { input, reply }).await
    }

    /// Click the centre of region `index` as it is positioned right now.
    pub async fn click_region(&self, index: usize) -> Result<ClickOutcome> {
        self.request(|reply| Command::ClickRegion { index, reply })
            .await?
    }

    pub async fn apply_effect(&self, id: EffectId) -> Result<ApplyOutcome> {
        self.request(|reply| Command::ApplyEffect { id, reply })
            .await?
    }

    /// Returns whether an active effect was removed.
    pub async fn remove_effect(&self, id: EffectId) -> Result<bool> {
        self.request(|reply| Command::RemoveEffect { id, reply })
            .await
    }

    pub async fn claim_mystery_box(&self, kind: ResourceKind) -> Result<u64> {
        self.request(|reply| Command::ClaimMysteryBox { kind, reply })
            .await?
    }

    /// Set a purchased upgrade level; returns the stored (clamped) level.
    pub async fn set_skill_level(&self, name: impl Into<String>, level: u32) -> Result<u32> {
        let name = name.into();
        self.request(|reply| Command::SetSkillLevel { name, level, reply })
            .await?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn restore(&self, snapshot: SessionSnapshot, reset_combo: bool) -> Result<()> {
        self.request(|reply| Command::Restore {
            snapshot: Box::new(snapshot),
            reset_combo,
            reply,
        })
        .await?
    }

    pub async fn reset(&self) -> Result<()> {
        self.request(|reply| Command::Reset { reply }).await?
    }

    /// Query the current session status (read-only).
    pub async fn query_status(&self) -> Result<SessionStatus> {
        self.request(|reply| Command::QueryStatus { reply }).await
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use runtime::Topic;
    ///
    /// let mut effects = handle.subscribe(Topic::Effects);
    /// while let Ok(event) = effects.recv().await {
    ///     // Render effect timers
    /// }
    /// ```
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> std::collections::HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub(crate) async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}
