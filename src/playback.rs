//! Host-facing playback glue.
//!
//! `PlaybackSession` owns the committed segment list, the repeat loop and the playback rate.
//! Every clock tick goes through [`PlaybackSession::on_tick`], which:
//! - asks the repeat loop whether to rewind (before anything else),
//! - locates the active segment at the *post-rewind* position,
//! - reports whether the highlighted row changed so the host can auto-scroll.
//!
//! Doing the loop check first means a looping segment's successor is never highlighted,
//! not even for the single frame before the host's seek lands.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::Result;
use crate::error::Error;
use crate::locate::{ActiveLocator, LinearLocator};
use crate::opts::Opts;
use crate::repeat::{LoopState, RepeatLoop, Seek};
use crate::segments::Segment;

/// Whatever plays the audio.
pub trait Clock {
    /// Current media position in seconds.
    fn position(&self) -> f64;
    fn seek(&mut self, to: f64);
    fn play(&mut self);
    fn set_rate(&mut self, rate: f32);
}

/// Result of processing one clock tick or user action.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickOutcome {
    /// A seek the host must apply to its clock.
    pub seek_to: Option<Seek>,
    /// The segment to highlight, if any.
    pub active: Option<usize>,
    /// `active` differs from the previous outcome; hosts scroll on this.
    pub highlight_changed: bool,
}

impl TickOutcome {
    /// Apply the seek (and resume, if requested) to `clock`.
    pub fn apply_to(&self, clock: &mut impl Clock) {
        if let Some(seek) = self.seek_to {
            clock.seek(seek.to);
            if seek.resume {
                clock.play();
            }
        }
    }
}

/// The selectable playback speeds and the current choice.
#[derive(Debug, Clone)]
pub struct PlaybackRate {
    steps: Vec<f32>,
    current: usize,
}

impl PlaybackRate {
    /// Build from configured steps, starting at the step nearest `1.0`.
    ///
    /// Non-finite and non-positive steps are ignored; an empty result falls back to `[1.0]`.
    pub fn new(steps: &[f32]) -> Self {
        let mut steps: Vec<f32> = steps
            .iter()
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
            .collect();
        steps.sort_by(f32::total_cmp);
        steps.dedup();
        if steps.is_empty() {
            steps.push(1.0);
        }

        let mut rate = Self { steps, current: 0 };
        rate.current = rate.nearest(1.0);
        rate
    }

    pub fn current(&self) -> f32 {
        self.steps[self.current]
    }

    pub fn steps(&self) -> &[f32] {
        &self.steps
    }

    /// Snap to the configured step nearest `rate` and return it.
    pub fn set(&mut self, rate: f32) -> f32 {
        self.current = self.nearest(rate);
        self.current()
    }

    /// One step up; saturates at the fastest step.
    pub fn faster(&mut self) -> f32 {
        self.current = (self.current + 1).min(self.steps.len() - 1);
        self.current()
    }

    /// One step down; saturates at the slowest step.
    pub fn slower(&mut self) -> f32 {
        self.current = self.current.saturating_sub(1);
        self.current()
    }

    fn nearest(&self, rate: f32) -> usize {
        self.steps
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - rate).abs().total_cmp(&(*b - rate).abs()))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        Self::new(&Opts::default().playback_rates)
    }
}

/// Playback state for one committed transcript.
pub struct PlaybackSession<L: ActiveLocator = LinearLocator> {
    segments: Vec<Segment>,
    repeat: RepeatLoop,
    rate: PlaybackRate,
    locator: L,
    active: Option<usize>,
}

impl PlaybackSession<LinearLocator> {
    pub fn new(segments: Vec<Segment>, opts: &Opts) -> Self {
        Self::with_locator(segments, opts, LinearLocator)
    }
}

impl<L: ActiveLocator> PlaybackSession<L> {
    /// Create a session using a custom locator (e.g. [`crate::locate::BisectLocator`]).
    ///
    /// `segments` must already be sorted by `start_time`; the session does not sort.
    pub fn with_locator(segments: Vec<Segment>, opts: &Opts, locator: L) -> Self {
        Self {
            segments,
            repeat: RepeatLoop::new(),
            rate: PlaybackRate::new(&opts.playback_rates),
            locator,
            active: None,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn loop_state(&self) -> LoopState {
        self.repeat.state()
    }

    pub fn rate(&self) -> f32 {
        self.rate.current()
    }

    /// Process a clock position update.
    pub fn on_tick(&mut self, t: f64) -> TickOutcome {
        let seek_to = self.repeat.check(&self.segments, t);
        let effective = seek_to.map_or(t, |seek| seek.to);
        self.relocate(effective, seek_to)
    }

    /// Read the clock, process the tick and apply any resulting seek.
    pub fn drive(&mut self, clock: &mut impl Clock) -> TickOutcome {
        let outcome = self.on_tick(clock.position());
        outcome.apply_to(clock);
        outcome
    }

    /// Toggle repeat looping on segment `index`.
    ///
    /// Entering (or switching) a loop yields a resuming seek to the segment's start.
    pub fn select_loop(&mut self, index: usize) -> TickOutcome {
        match self.repeat.select(&self.segments, index) {
            Some(seek) => self.relocate(seek.to, Some(seek)),
            None => self.unchanged(),
        }
    }

    /// The user clicked a sentence: leave any loop and play from its start.
    ///
    /// An out-of-range index only leaves the loop.
    pub fn jump_to(&mut self, index: usize) -> TickOutcome {
        self.repeat.exit();
        let Some(seg) = self.segments.get(index) else {
            warn!(index, len = self.segments.len(), "jump target out of range");
            return self.unchanged();
        };
        let seek = Seek {
            to: seg.start_time,
            resume: true,
        };
        self.relocate(seek.to, Some(seek))
    }

    pub fn exit_loop(&mut self) {
        self.repeat.exit();
    }

    /// Swap in a freshly committed list. A loop on a vanished index goes idle.
    pub fn replace_segments(&mut self, segments: Vec<Segment>) {
        debug!(len = segments.len(), "segments replaced");
        self.segments = segments;
        self.repeat.revalidate(&self.segments);
        self.active = None;
    }

    pub fn set_rate(&mut self, rate: f32, clock: &mut impl Clock) -> f32 {
        let rate = self.rate.set(rate);
        clock.set_rate(rate);
        rate
    }

    pub fn faster(&mut self, clock: &mut impl Clock) -> f32 {
        let rate = self.rate.faster();
        clock.set_rate(rate);
        rate
    }

    pub fn slower(&mut self, clock: &mut impl Clock) -> f32 {
        let rate = self.rate.slower();
        clock.set_rate(rate);
        rate
    }

    fn relocate(&mut self, t: f64, seek_to: Option<Seek>) -> TickOutcome {
        let active = self.locator.locate(&self.segments, t);
        let highlight_changed = active != self.active;
        self.active = active;
        TickOutcome {
            seek_to,
            active,
            highlight_changed,
        }
    }

    fn unchanged(&self) -> TickOutcome {
        TickOutcome {
            seek_to: None,
            active: self.active,
            highlight_changed: false,
        }
    }
}

/// User actions forwarded to a subscribed session.
#[derive(Debug, Clone)]
pub enum Command {
    SelectLoop(usize),
    JumpTo(usize),
    ExitLoop,
    ReplaceSegments(Vec<Segment>),
}

/// Keeps a session subscribed to a clock feed. Dropping it unsubscribes.
pub struct TickSubscription {
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TickSubscription {
    pub fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::msg("playback subscription already closed"))
    }

    /// Stop the feed and wait for the session task to wind down.
    pub async fn unsubscribe(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TickSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<L> PlaybackSession<L>
where
    L: ActiveLocator + Send + 'static,
{
    /// Move the session onto a task fed by `positions`.
    ///
    /// Outcomes that carry a seek or a highlight change are published on the returned
    /// receiver. Must be called from within a tokio runtime.
    pub fn subscribe(
        mut self,
        mut positions: watch::Receiver<f64>,
    ) -> (TickSubscription, mpsc::UnboundedReceiver<TickOutcome>) {
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
        let (out_tx, out_rx) = mpsc::unbounded_channel::<TickOutcome>();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            loop {
                let outcome = tokio::select! {
                    _ = token.cancelled() => break,
                    changed = positions.changed() => {
                        if changed.is_err() {
                            debug!("clock feed closed");
                            break;
                        }
                        let t = *positions.borrow_and_update();
                        self.on_tick(t)
                    }
                    cmd = cmd_rx.recv() => match cmd {
                        Some(Command::SelectLoop(i)) => self.select_loop(i),
                        Some(Command::JumpTo(i)) => self.jump_to(i),
                        Some(Command::ExitLoop) => {
                            self.exit_loop();
                            continue;
                        }
                        Some(Command::ReplaceSegments(segments)) => {
                            self.replace_segments(segments);
                            continue;
                        }
                        None => break,
                    },
                };

                if (outcome.seek_to.is_some() || outcome.highlight_changed)
                    && out_tx.send(outcome).is_err()
                {
                    break;
                }
            }
        });

        let subscription = TickSubscription {
            commands: cmd_tx,
            cancel,
            task: Some(task),
        };
        (subscription, out_rx)
    }
}
