//! Read Session State
//!
//! Mutable record owned by one read: prompt cursor, playback flags and the
//! idle deadline.

use super::channel::PlaybackHandle;
use std::time::Duration;
use tokio::time::Instant;

/// State of one read invocation
#[derive(Debug)]
pub struct Session {
    /// Prompts to play, mutated by the retry path
    prompts: Vec<String>,
    /// Cursor into `prompts`
    prompt_index: usize,
    /// Set once teardown began or the collector was satisfied
    suppress_next_prompt: bool,
    /// Set once the current cycle committed to an outcome
    finished: bool,
    /// True between a play request and its finish or stop
    playing: bool,
    /// Plays whose finished event has not arrived yet
    outstanding: u32,
    playback: PlaybackHandle,
    idle_deadline: Option<Instant>,
}

impl Session {
    pub fn new(prompts: Vec<String>) -> Self {
        Self {
            prompts,
            prompt_index: 0,
            suppress_next_prompt: false,
            finished: false,
            playing: false,
            outstanding: 0,
            playback: PlaybackHandle::new(),
            idle_deadline: None,
        }
    }

    pub fn playback(&self) -> &PlaybackHandle {
        &self.playback
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn prompt_index(&self) -> usize {
        self.prompt_index
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn suppresses_next_prompt(&self) -> bool {
        self.suppress_next_prompt
    }

    pub fn idle_deadline(&self) -> Option<Instant> {
        self.idle_deadline
    }

    /// Take the prompt under the cursor and advance it.
    ///
    /// Returns `None` when suppressed or the list is exhausted.
    pub fn next_prompt(&mut self) -> Option<String> {
        if self.suppress_next_prompt {
            return None;
        }
        let prompt = self.prompts.get(self.prompt_index).cloned()?;
        self.prompt_index += 1;
        Some(prompt)
    }

    pub fn prompts_exhausted(&self) -> bool {
        self.prompt_index >= self.prompts.len()
    }

    /// Record that a play request was issued
    pub fn playback_started(&mut self) {
        self.outstanding += 1;
        self.playing = true;
    }

    /// Record a finished event for our playback.
    ///
    /// Returns false for the late finish of a stopped playback that has
    /// already been superseded by a newer play.
    pub fn playback_finished(&mut self) -> bool {
        self.outstanding = self.outstanding.saturating_sub(1);
        if self.outstanding > 0 {
            return false;
        }
        self.playing = false;
        true
    }

    /// Stop sequencing once the prompt list ran out while digits are pending
    pub fn stop_sequencing(&mut self) {
        self.suppress_next_prompt = true;
    }

    /// Replace any live idle timer with one expiring after `timeout`
    pub fn arm_idle(&mut self, timeout: Duration) {
        self.idle_deadline = Some(Instant::now() + timeout);
    }

    pub fn disarm_idle(&mut self) {
        self.idle_deadline = None;
    }

    /// Commit the current cycle.
    ///
    /// Disarms the idle timer and suppresses further prompts. Returns true
    /// when a stop request must be sent for an active playback; repeated
    /// calls never ask for a second stop.
    pub fn finish(&mut self) -> bool {
        self.finished = true;
        self.suppress_next_prompt = true;
        self.disarm_idle();
        if self.playing {
            self.playing = false;
            return true;
        }
        false
    }

    /// The call dropped: nothing is playing any more
    pub fn hangup(&mut self) {
        self.playing = false;
        self.outstanding = 0;
        self.finish();
    }

    /// Rewind for another attempt, prepending `invalid_prompt` once
    pub fn reset_for_retry(&mut self, invalid_prompt: &str) {
        self.prompt_index = 0;
        self.finished = false;
        self.suppress_next_prompt = false;
        if self.prompts.first().map(String::as_str) != Some(invalid_prompt) {
            self.prompts.insert(0, invalid_prompt.to_string());
        }
    }
}
