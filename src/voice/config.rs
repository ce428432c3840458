//! Reader Configuration
//!
//! Marker prompts, defaults and the fixed settle delays used by reads

use super::media::DEFAULT_SCHEME;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReaderConfig {
    /// Media scheme prepended to prompt names
    pub media_scheme: String,
    /// Prompt prepended to the list when a response is rejected
    pub invalid_prompt: String,
    /// Prompt played before hanging up on a failed read
    pub goodbye_prompt: String,
    /// Key that ends collection immediately
    pub terminator: char,
    /// Attempts used when a read does not set its own
    pub default_attempts: u32,
    /// Inactivity timeout in seconds used when a read does not set its own
    pub default_timeout_secs: u64,
    /// Gap between consecutive prompts in milliseconds
    pub prompt_gap_ms: u64,
    /// Pause before replaying the prompts after a rejected response
    pub retry_pause_ms: u64,
    /// Pause before the goodbye prompt once attempts are exhausted
    pub goodbye_delay_ms: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            media_scheme: DEFAULT_SCHEME.to_string(),
            invalid_prompt: "option-is-invalid".to_string(),
            goodbye_prompt: "goodbye".to_string(),
            terminator: '#',
            default_attempts: 3,
            default_timeout_secs: 10,
            prompt_gap_ms: 20,
            retry_pause_ms: 100,
            goodbye_delay_ms: 100,
        }
    }
}

impl ReaderConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.media_scheme.is_empty() {
            return Err("Media scheme is required".to_string());
        }

        if self.invalid_prompt.is_empty() {
            return Err("Invalid-selection prompt is required".to_string());
        }

        if self.goodbye_prompt.is_empty() {
            return Err("Goodbye prompt is required".to_string());
        }

        if self.default_attempts == 0 {
            return Err("Default attempts must be positive".to_string());
        }

        if self.default_timeout_secs == 0 {
            return Err("Default timeout must be positive".to_string());
        }

        Ok(())
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn prompt_gap(&self) -> Duration {
        Duration::from_millis(self.prompt_gap_ms)
    }

    pub fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.retry_pause_ms)
    }

    pub fn goodbye_delay(&self) -> Duration {
        Duration::from_millis(self.goodbye_delay_ms)
    }
}
