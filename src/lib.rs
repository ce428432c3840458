//! ivr-read library
//!
//! Prompt-and-collect reads for a single phone call: play audio prompts,
//! collect DTMF digits, retry on invalid input and hang up after a goodbye
//! prompt when the caller runs out of attempts or goes quiet.

pub mod cli;
pub mod config;
pub mod logging;
pub mod voice;
