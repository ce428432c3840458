//! Simulated Call Channel
//!
//! In-process [`CallChannel`] whose playbacks finish after a fixed duration.
//! DTMF can be injected directly or scripted to follow a given prompt.

use super::channel::{CallChannel, ChannelEvent, EventSubscription, PlaybackHandle};
use super::media::strip_extension;
use super::{Result, VoiceError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulatorConfig {
    /// How long every prompt takes to play, in milliseconds
    pub playback_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self { playback_ms: 1000 }
    }
}

#[derive(Debug)]
struct ActivePlayback {
    generation: u64,
    media: String,
}

#[derive(Debug, Default)]
struct State {
    listeners: Vec<mpsc::UnboundedSender<ChannelEvent>>,
    played: Vec<String>,
    scripts: HashMap<String, VecDeque<String>>,
    active: HashMap<String, ActivePlayback>,
    generation: u64,
    stops: usize,
    hangups: usize,
    ended: bool,
}

impl State {
    fn broadcast(&mut self, event: ChannelEvent) {
        self.listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn finish(&mut self, playback_id: &str, media: &str, scripted: bool) {
        self.broadcast(ChannelEvent::PlaybackFinished {
            playback_id: playback_id.to_string(),
        });
        if !scripted {
            return;
        }

        let prompt = media.split_once(':').map_or(media, |(_, name)| name);
        let response = self
            .scripts
            .get_mut(prompt)
            .and_then(|queue| queue.pop_front());
        if let Some(digits) = response {
            trace!(prompt = %prompt, digits = %digits, "scripted response");
            for digit in digits.chars() {
                self.broadcast(ChannelEvent::Dtmf { digit });
            }
        }
    }
}

#[derive(Debug)]
struct Inner {
    config: SimulatorConfig,
    state: Mutex<State>,
}

/// Simulated call
#[derive(Debug, Clone)]
pub struct SimulatedChannel {
    inner: Arc<Inner>,
}

impl SimulatedChannel {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Queue `digits` to be pressed right after the next natural finish of
    /// `prompt`. Each queued response is used once.
    pub fn script(&self, prompt: &str, digits: &str) {
        let mut state = self.inner.state.lock();
        state
            .scripts
            .entry(strip_extension(prompt).to_string())
            .or_default()
            .push_back(digits.to_string());
    }

    /// Press one key
    pub fn press(&self, digit: char) {
        self.emit(ChannelEvent::Dtmf { digit });
    }

    /// Press each key of `digits` in order
    pub fn press_all(&self, digits: &str) {
        for digit in digits.chars() {
            self.press(digit);
        }
    }

    /// Drop the call from the far end
    pub fn end_call(&self) {
        let mut state = self.inner.state.lock();
        state.ended = true;
        state.active.clear();
        state.broadcast(ChannelEvent::CallEnded);
    }

    /// Deliver a raw event to every subscriber
    pub fn emit(&self, event: ChannelEvent) {
        self.inner.state.lock().broadcast(event);
    }

    /// Media references played so far
    pub fn played(&self) -> Vec<String> {
        self.inner.state.lock().played.clone()
    }

    pub fn stop_count(&self) -> usize {
        self.inner.state.lock().stops
    }

    pub fn hangup_count(&self) -> usize {
        self.inner.state.lock().hangups
    }

    /// Subscriptions still held by someone
    pub fn listener_count(&self) -> usize {
        let mut state = self.inner.state.lock();
        state.listeners.retain(|tx| !tx.is_closed());
        state.listeners.len()
    }
}

#[async_trait]
impl CallChannel for SimulatedChannel {
    async fn play(&self, media: &str, playback: &PlaybackHandle) -> Result<()> {
        let generation = {
            let mut state = self.inner.state.lock();
            if state.ended {
                return Err(VoiceError::ChannelClosed);
            }
            state.generation += 1;
            let generation = state.generation;
            state.played.push(media.to_string());
            state.active.insert(
                playback.id().to_string(),
                ActivePlayback {
                    generation,
                    media: media.to_string(),
                },
            );
            generation
        };
        debug!(media = %media, playback_id = %playback.id(), "simulated play");

        let inner = Arc::clone(&self.inner);
        let playback_id = playback.id().to_string();
        let duration = Duration::from_millis(self.inner.config.playback_ms);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let mut state = inner.state.lock();
            let current = state
                .active
                .get(&playback_id)
                .is_some_and(|active| active.generation == generation);
            if current {
                if let Some(active) = state.active.remove(&playback_id) {
                    state.finish(&playback_id, &active.media, true);
                }
            }
        });
        Ok(())
    }

    async fn stop(&self, playback: &PlaybackHandle) -> Result<()> {
        let mut state = self.inner.state.lock();
        state.stops += 1;
        match state.active.remove(playback.id()) {
            Some(active) => {
                state.finish(playback.id(), &active.media, false);
                Ok(())
            }
            None => Err(VoiceError::Playback(format!(
                "playback {} is not playing",
                playback.id()
            ))),
        }
    }

    async fn hangup(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        state.hangups += 1;
        if state.ended {
            return Err(VoiceError::Hangup("call already ended".to_string()));
        }
        state.ended = true;
        state.active.clear();
        state.broadcast(ChannelEvent::CallEnded);
        Ok(())
    }

    fn subscribe(&self) -> EventSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.state.lock().listeners.push(tx);
        EventSubscription::new(rx)
    }
}
