//! Prompt-and-collect Read
//!
//! Plays a prompt list on a call, optionally collects a fixed number of DTMF
//! digits, replays the prompts with an "invalid selection" marker when the
//! response is rejected, and hangs up with a goodbye prompt when the caller
//! runs out of attempts or stops responding.
//!
//! A read is a single task consuming one ordered stream of wakeups: channel
//! events, the idle deadline and at most one pending delayed step. Every
//! branch below is a match over that stream.

use super::channel::{CallChannel, ChannelEvent, EventSubscription};
use super::collector::{Collected, DigitCollector};
use super::config::ReaderConfig;
use super::media::media_ref;
use super::session::Session;
use super::ReadError;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

/// Predicate deciding whether a collected digit string is acceptable
pub type Validator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Logs at info level when the read asked for diagnostics, debug otherwise
macro_rules! diag {
    ($debug:expr, $($arg:tt)+) => {
        if $debug {
            info!($($arg)+);
        } else {
            debug!($($arg)+);
        }
    };
}

/// Parameters of one read
#[derive(Clone)]
pub struct ReadOptions {
    prompts: Vec<String>,
    digits: usize,
    attempts: Option<u32>,
    timeout: Option<Duration>,
    validator: Option<Validator>,
    debug: bool,
}

impl ReadOptions {
    /// Play `prompts` in order without collecting digits
    pub fn new<I, S>(prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prompts: prompts.into_iter().map(Into::into).collect(),
            digits: 0,
            attempts: None,
            timeout: None,
            validator: None,
            debug: false,
        }
    }

    /// Number of digits to collect after the prompts
    pub fn digits(mut self, digits: usize) -> Self {
        self.digits = digits;
        self
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }

    /// Inactivity timeout while digits are pending
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn resolve(self, config: &ReaderConfig) -> Result<Resolved, ReadError> {
        if self.prompts.is_empty() {
            return Err(ReadError::InvalidOptions(
                "at least one prompt is required".to_string(),
            ));
        }

        let attempts = self.attempts.unwrap_or(config.default_attempts);
        if attempts == 0 {
            return Err(ReadError::InvalidOptions(
                "attempts must be positive".to_string(),
            ));
        }

        let timeout = self.timeout.unwrap_or_else(|| config.default_timeout());
        if timeout.is_zero() {
            return Err(ReadError::InvalidOptions(
                "timeout must be positive".to_string(),
            ));
        }

        Ok(Resolved {
            prompts: self.prompts,
            digits: self.digits,
            attempts,
            timeout,
            validator: self.validator,
            debug: self.debug,
        })
    }
}

impl fmt::Debug for ReadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOptions")
            .field("prompts", &self.prompts)
            .field("digits", &self.digits)
            .field("attempts", &self.attempts)
            .field("timeout", &self.timeout)
            .field("validator", &self.validator.is_some())
            .field("debug", &self.debug)
            .finish()
    }
}

struct Resolved {
    prompts: Vec<String>,
    digits: usize,
    attempts: u32,
    timeout: Duration,
    validator: Option<Validator>,
    debug: bool,
}

/// Successful result of a read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Accepted digits, `None` when the read collected none
    pub digits: Option<String>,
    /// Prompt cycles started
    pub attempts: u32,
    /// Prompts rendered, in order, including markers
    pub prompts_played: Vec<String>,
}

/// Reusable read operation bound to one call
pub struct Reader<C: CallChannel + ?Sized> {
    channel: Arc<C>,
    config: ReaderConfig,
}

impl<C: CallChannel + ?Sized> Reader<C> {
    pub fn new(channel: Arc<C>, config: ReaderConfig) -> Self {
        Self { channel, config }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Run one read to completion.
    ///
    /// Resolves with the accepted digits (or no digits for a play-only read),
    /// or fails with the reason the read ended. Every listener and timer the
    /// read registered is released before this returns.
    pub async fn read(&self, options: ReadOptions) -> Result<ReadOutcome, ReadError> {
        let options = options.resolve(&self.config)?;
        let events = self.channel.subscribe();
        ReadRun::new(&*self.channel, &self.config, options, events)
            .run()
            .await
    }

    /// Like [`Reader::read`], recording the result in a [`super::ReadReport`]
    pub async fn read_with_report(
        &self,
        options: ReadOptions,
    ) -> (Result<ReadOutcome, ReadError>, super::ReadReport) {
        let mut report = super::ReadReport::start(options.prompts.clone(), options.digits);
        let result = self.read(options).await;
        report.finish(&result);
        (result, report)
    }
}

/// What the read is doing with playback-finished events
#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    /// Walking the prompt list
    Sequencing,
    /// Prompts exhausted, only digits or the idle timer move us on
    Listening,
    /// Response rejected, waiting to replay the prompts
    Settling,
    /// Giving up, waiting to play the goodbye
    Closing(ReadError),
    /// Goodbye playing, hang up when it finishes
    Goodbye(ReadError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    NextPrompt,
    RestartAttempt,
    PlayGoodbye,
}

enum Wake {
    Event(Option<ChannelEvent>),
    Idle,
    Step,
}

type Flow = ControlFlow<Result<ReadOutcome, ReadError>>;

struct ReadRun<'a, C: CallChannel + ?Sized> {
    channel: &'a C,
    config: &'a ReaderConfig,
    options: Resolved,
    events: EventSubscription,
    session: Session,
    collector: Option<DigitCollector>,
    phase: Phase,
    step: Option<(Instant, Step)>,
    /// Plays the channel refused; each counts as an immediate finish
    failed_plays: u32,
    attempt: u32,
    rejections: u32,
    played: Vec<String>,
}

async fn sleep_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl<'a, C: CallChannel + ?Sized> ReadRun<'a, C> {
    fn new(
        channel: &'a C,
        config: &'a ReaderConfig,
        mut options: Resolved,
        events: EventSubscription,
    ) -> Self {
        let prompts = std::mem::take(&mut options.prompts);
        Self {
            channel,
            config,
            options,
            events,
            session: Session::new(prompts),
            collector: None,
            phase: Phase::Sequencing,
            step: None,
            failed_plays: 0,
            attempt: 0,
            rejections: 0,
            played: Vec::new(),
        }
    }

    async fn run(mut self) -> Result<ReadOutcome, ReadError> {
        diag!(
            self.options.debug,
            playback_id = %self.session.playback().id(),
            prompts = self.session.prompts().len(),
            digits = self.options.digits,
            "starting read"
        );
        self.start_attempt().await;

        loop {
            let wake = if self.failed_plays > 0 {
                self.failed_plays -= 1;
                Wake::Event(Some(ChannelEvent::PlaybackFinished {
                    playback_id: self.session.playback().id().to_string(),
                }))
            } else {
                let idle = self.session.idle_deadline();
                let step = self.step.map(|(at, _)| at);
                tokio::select! {
                    biased;
                    event = self.events.recv() => Wake::Event(event),
                    _ = sleep_opt(idle) => Wake::Idle,
                    _ = sleep_opt(step) => Wake::Step,
                }
            };

            let flow = match wake {
                Wake::Event(Some(event)) => self.on_event(event).await,
                Wake::Event(None) => {
                    debug!("event stream closed");
                    self.on_hangup()
                }
                Wake::Idle => self.on_idle_timeout().await,
                Wake::Step => self.on_step().await,
            };

            if let ControlFlow::Break(result) = flow {
                return result;
            }
        }
    }

    async fn start_attempt(&mut self) {
        self.attempt += 1;
        self.phase = Phase::Sequencing;
        self.collector = (self.options.digits > 0)
            .then(|| DigitCollector::new(self.options.digits, self.config.terminator));
        diag!(self.options.debug, attempt = self.attempt, "playing prompts");
        self.play_next().await;
    }

    async fn play_next(&mut self) {
        if let Some(prompt) = self.session.next_prompt() {
            self.play(prompt).await;
        }
    }

    async fn play(&mut self, prompt: String) {
        let media = media_ref(&self.config.media_scheme, &prompt);
        debug!(prompt = %prompt, media = %media, "play");
        self.session.playback_started();
        match self.channel.play(&media, self.session.playback()).await {
            Ok(()) => self.played.push(prompt),
            Err(e) => {
                debug!(error = %e, media = %media, "play failed");
                self.failed_plays += 1;
            }
        }
    }

    async fn stop_playback(&mut self) {
        if let Err(e) = self.channel.stop(self.session.playback()).await {
            debug!(error = %e, "stop failed");
        }
    }

    fn schedule(&mut self, after: Duration, step: Step) {
        self.step = Some((Instant::now() + after, step));
    }

    async fn on_event(&mut self, event: ChannelEvent) -> Flow {
        match event {
            ChannelEvent::PlaybackFinished { playback_id } => {
                if playback_id != self.session.playback().id() {
                    return ControlFlow::Continue(());
                }
                self.on_playback_finished().await
            }
            ChannelEvent::Dtmf { digit } => self.on_digit(digit).await,
            ChannelEvent::CallEnded => self.on_hangup(),
        }
    }

    async fn on_playback_finished(&mut self) -> Flow {
        if !self.session.playback_finished() {
            return ControlFlow::Continue(());
        }

        match self.phase.clone() {
            Phase::Sequencing => {
                if !self.session.prompts_exhausted() {
                    self.schedule(self.config.prompt_gap(), Step::NextPrompt);
                    return ControlFlow::Continue(());
                }
                if self.options.digits == 0 {
                    return self.complete(None).await;
                }
                diag!(self.options.debug, attempt = self.attempt, "prompts done, waiting for digits");
                self.session.stop_sequencing();
                self.session.arm_idle(self.options.timeout);
                self.phase = Phase::Listening;
                ControlFlow::Continue(())
            }
            Phase::Goodbye(reason) => {
                info!(reason = reason.reason(), "ending call");
                if let Err(e) = self.channel.hangup().await {
                    debug!(error = %e, "hangup failed");
                }
                ControlFlow::Break(Err(reason))
            }
            Phase::Listening | Phase::Settling | Phase::Closing(_) => ControlFlow::Continue(()),
        }
    }

    async fn on_digit(&mut self, digit: char) -> Flow {
        if !matches!(self.phase, Phase::Sequencing | Phase::Listening) {
            return ControlFlow::Continue(());
        }
        let Some(collector) = self.collector.as_mut() else {
            return ControlFlow::Continue(());
        };
        if !collector.accepts(digit) {
            return ControlFlow::Continue(());
        }

        self.session.arm_idle(self.options.timeout);
        let Some(collected) = collector.push(digit) else {
            return ControlFlow::Continue(());
        };

        self.collector = None;
        if self.session.finish() {
            self.stop_playback().await;
        }

        match collected {
            Collected::Terminated => {
                diag!(self.options.debug, "terminator pressed");
                self.complete(Some(self.config.terminator.to_string())).await
            }
            Collected::Digits(digits) => {
                let accepted = self
                    .options
                    .validator
                    .as_ref()
                    .map_or(true, |valid| valid(&digits));
                if accepted {
                    return self.complete(Some(digits)).await;
                }
                self.reject(&digits);
                ControlFlow::Continue(())
            }
        }
    }

    /// The response failed validation; retry or give up.
    ///
    /// A read allows `attempts + 1` cycles before giving up.
    fn reject(&mut self, digits: &str) {
        self.rejections += 1;
        diag!(
            self.options.debug,
            attempt = self.attempt,
            attempts = self.options.attempts,
            digits = %digits,
            "response rejected"
        );

        if self.rejections > self.options.attempts {
            self.phase = Phase::Closing(ReadError::AttemptLimit);
            self.schedule(self.config.goodbye_delay(), Step::PlayGoodbye);
        } else {
            self.phase = Phase::Settling;
            self.schedule(self.config.retry_pause(), Step::RestartAttempt);
        }
    }

    async fn on_step(&mut self) -> Flow {
        let Some((_, step)) = self.step.take() else {
            return ControlFlow::Continue(());
        };

        match step {
            Step::NextPrompt => {
                if self.phase == Phase::Sequencing && !self.session.suppresses_next_prompt() {
                    self.play_next().await;
                }
            }
            Step::RestartAttempt => {
                self.session.reset_for_retry(&self.config.invalid_prompt);
                self.start_attempt().await;
            }
            Step::PlayGoodbye => {
                if let Phase::Closing(reason) = self.phase.clone() {
                    self.play_goodbye(reason).await;
                }
            }
        }
        ControlFlow::Continue(())
    }

    async fn on_idle_timeout(&mut self) -> Flow {
        self.session.disarm_idle();
        if self.session.is_finished() {
            return ControlFlow::Continue(());
        }

        diag!(self.options.debug, playback_id = %self.session.playback().id(), "caller stopped responding");
        if self.session.finish() {
            self.stop_playback().await;
        }
        self.step = None;
        self.play_goodbye(ReadError::TimeoutLimit).await;
        ControlFlow::Continue(())
    }

    async fn play_goodbye(&mut self, reason: ReadError) {
        self.collector = None;
        self.phase = Phase::Goodbye(reason);
        let goodbye = self.config.goodbye_prompt.clone();
        self.play(goodbye).await;
    }

    fn on_hangup(&mut self) -> Flow {
        self.session.hangup();
        self.step = None;
        match self.phase.clone() {
            // the outcome was already decided; the call is gone so skip the hangup
            Phase::Closing(reason) | Phase::Goodbye(reason) => ControlFlow::Break(Err(reason)),
            _ => {
                info!(attempt = self.attempt, "call ended during read");
                ControlFlow::Break(Err(ReadError::Hangup))
            }
        }
    }

    async fn complete(&mut self, digits: Option<String>) -> Flow {
        if self.session.finish() {
            self.stop_playback().await;
        }
        self.step = None;
        diag!(self.options.debug, attempt = self.attempt, digits = ?digits, "read complete");
        ControlFlow::Break(Ok(ReadOutcome {
            digits,
            attempts: self.attempt,
            prompts_played: std::mem::take(&mut self.played),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::simulated::{SimulatedChannel, SimulatorConfig};

    fn reader(channel: &SimulatedChannel) -> Reader<SimulatedChannel> {
        Reader::new(Arc::new(channel.clone()), ReaderConfig::default())
    }

    #[test]
    fn test_options_defaults_resolve_from_config() {
        let config = ReaderConfig::default();
        let resolved = ReadOptions::new(["welcome"]).resolve(&config).unwrap();
        assert_eq!(resolved.digits, 0);
        assert_eq!(resolved.attempts, 3);
        assert_eq!(resolved.timeout, Duration::from_secs(10));
        assert!(resolved.validator.is_none());
    }

    #[test]
    fn test_options_reject_empty_prompts() {
        let err = ReadOptions::new(Vec::<String>::new())
            .resolve(&ReaderConfig::default())
            .err()
            .unwrap();
        assert_eq!(err.reason(), "invalid options");
    }

    #[test]
    fn test_options_reject_zero_attempts_and_timeout() {
        let config = ReaderConfig::default();
        assert!(ReadOptions::new(["a"]).attempts(0).resolve(&config).is_err());
        assert!(ReadOptions::new(["a"])
            .timeout(Duration::ZERO)
            .resolve(&config)
            .is_err());
    }

    #[test]
    fn test_options_debug_hides_validator() {
        let options = ReadOptions::new(["a"]).validator(|d| d == "1");
        let rendered = format!("{:?}", options);
        assert!(rendered.contains("validator: true"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_options_play_nothing() {
        let channel = SimulatedChannel::new(SimulatorConfig::default());
        let result = reader(&channel).read(ReadOptions::new(["a"]).attempts(0)).await;
        assert!(matches!(result, Err(ReadError::InvalidOptions(_))));
        assert!(channel.played().is_empty());
        assert_eq!(channel.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prompts_are_spaced_by_gap() {
        let channel = SimulatedChannel::new(SimulatorConfig {
            playback_ms: 1000,
            ..SimulatorConfig::default()
        });
        let start = Instant::now();
        let outcome = reader(&channel)
            .read(ReadOptions::new(["one", "two", "three"]))
            .await
            .unwrap();

        assert_eq!(outcome.digits, None);
        // three playbacks and two gaps
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3040), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(3100), "elapsed {:?}", elapsed);
        assert_eq!(channel.played(), vec!["sound:one", "sound:two", "sound:three"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreign_playback_events_are_ignored() {
        let channel = SimulatedChannel::new(SimulatorConfig::default());
        channel.script("enter-pin", "12");
        let task = {
            let reader = reader(&channel);
            tokio::spawn(async move { reader.read(ReadOptions::new(["enter-pin"]).digits(2)).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        channel.emit(ChannelEvent::PlaybackFinished {
            playback_id: "someone-else".to_string(),
        });

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome.digits.as_deref(), Some("12"));
        assert_eq!(channel.played(), vec!["sound:enter-pin"]);
    }
}
