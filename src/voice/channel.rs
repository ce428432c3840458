//! Call Channel
//!
//! The capability set the reader consumes from its call-control collaborator.

use super::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Events delivered by a call channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A playback started with `play` has finished or was stopped
    PlaybackFinished { playback_id: String },
    /// The caller pressed a key
    Dtmf { digit: char },
    /// The call dropped
    CallEnded,
}

/// Handle to the playback instance a read renders prompts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackHandle {
    id: String,
}

impl PlaybackHandle {
    /// Create a handle with a fresh id
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Default for PlaybackHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped event subscription.
///
/// The listener is registered for as long as this value lives; dropping it
/// deregisters it with the channel.
#[derive(Debug)]
pub struct EventSubscription {
    rx: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl EventSubscription {
    pub fn new(rx: mpsc::UnboundedReceiver<ChannelEvent>) -> Self {
        Self { rx }
    }

    /// Next event, or `None` once the channel has gone away
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        self.rx.recv().await
    }
}

/// One active call
#[async_trait]
pub trait CallChannel: Send + Sync {
    /// Start rendering `media` on `playback`
    async fn play(&self, media: &str, playback: &PlaybackHandle) -> Result<()>;

    /// Stop whatever `playback` is rendering
    async fn stop(&self, playback: &PlaybackHandle) -> Result<()>;

    /// Terminate the call
    async fn hangup(&self) -> Result<()>;

    /// Subscribe to playback, DTMF and call-ended events
    fn subscribe(&self) -> EventSubscription;
}
