//! Tween configuration
//!
//! [`TweenOptions`] is a plain value object built with `with_*` methods.
//! A tween takes its own copy at construction; afterwards only the engine
//! changes it (the ease when mirroring with ease reversal, and the paused
//! flag through [`Tween::set_paused`](crate::Tween::set_paused)).

use std::sync::Arc;

use crate::easing::Ease;
use crate::tween::Tween;

/// Repetition count that never runs out
pub const REPEAT_FOREVER: u32 = u32::MAX;

/// What happens when a cycle completes and more repetitions remain
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Repetition {
    /// Run a single cycle; the repetition count is ignored
    #[default]
    None,
    /// Jump back to the start values and run again
    Loop,
    /// Run back towards the start values
    MirrorValues,
    /// Run back towards the start values with the ease reversed
    MirrorValuesAndEase,
}

impl Repetition {
    pub fn is_mirror(&self) -> bool {
        matches!(self, Self::MirrorValues | Self::MirrorValuesAndEase)
    }

    pub fn reverses_ease(&self) -> bool {
        matches!(self, Self::MirrorValuesAndEase)
    }
}

/// Where a stopped tween leaves its target
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EndState {
    /// Leave the values exactly as last written
    Current,
    /// Write the end value of the tween
    #[default]
    Final,
}

/// Lifecycle hooks
///
/// All hooks default to no-ops. They are called without any engine lock
/// held, so a hook may stop, restart or pause the tween it is told about.
pub trait TweenDelegate: Send + Sync {
    /// First tick of the first cycle, before values are written
    fn will_start(&self, _tween: &Tween) {}

    /// First tick of a later cycle, before values are written
    fn will_repeat(&self, _tween: &Tween) {}

    /// Tick that completes the last cycle, before values are written
    fn will_finish(&self, _tween: &Tween) {}

    /// After the first values have been written
    fn did_start(&self, _tween: &Tween) {}

    /// After a cycle that is followed by another one has completed
    fn did_repeat(&self, _tween: &Tween) {}

    /// After the last cycle has completed
    fn did_finish(&self, _tween: &Tween) {}
}

/// Tween configuration
#[derive(Clone, Default)]
pub struct TweenOptions {
    /// Group name for registry lookups
    pub name: Option<String>,
    pub ease: Ease,
    /// Seconds to wait before the first cycle
    pub delay: f64,
    pub is_paused: bool,
    /// Swap the from and to values
    pub is_reversed: bool,
    /// Offset from and to by the target's values at construction
    pub is_relative: bool,
    pub repetition: Repetition,
    /// Cycles to run after the first one; [`REPEAT_FOREVER`] never stops
    pub repeat_count: u32,
    /// Seconds to wait before each repeated cycle
    pub repeat_delay: f64,
    pub end_state: EndState,
    pub delegate: Option<Arc<dyn TweenDelegate>>,
}

impl TweenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn with_delay(mut self, seconds: f64) -> Self {
        self.delay = seconds.max(0.0);
        self
    }

    pub fn paused(mut self, paused: bool) -> Self {
        self.is_paused = paused;
        self
    }

    pub fn reversed(mut self, reversed: bool) -> Self {
        self.is_reversed = reversed;
        self
    }

    pub fn relative(mut self, relative: bool) -> Self {
        self.is_relative = relative;
        self
    }

    pub fn with_repetition(mut self, repetition: Repetition) -> Self {
        self.repetition = repetition;
        self
    }

    pub fn with_repeat_count(mut self, count: u32) -> Self {
        self.repeat_count = count;
        self
    }

    /// Builder: repeat forever
    pub fn forever(self) -> Self {
        self.with_repeat_count(REPEAT_FOREVER)
    }

    pub fn with_repeat_delay(mut self, seconds: f64) -> Self {
        self.repeat_delay = seconds.max(0.0);
        self
    }

    pub fn with_end_state(mut self, end_state: EndState) -> Self {
        self.end_state = end_state;
        self
    }

    pub fn with_delegate(mut self, delegate: Arc<dyn TweenDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Number of cycles after the first; zero unless a repetition mode is set
    pub(crate) fn effective_repeat_count(&self) -> u32 {
        match self.repetition {
            Repetition::None => 0,
            _ => self.repeat_count,
        }
    }

    pub fn repeats_forever(&self) -> bool {
        self.effective_repeat_count() == REPEAT_FOREVER
    }
}

impl std::fmt::Debug for TweenOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TweenOptions")
            .field("name", &self.name)
            .field("ease", &self.ease)
            .field("delay", &self.delay)
            .field("is_paused", &self.is_paused)
            .field("is_reversed", &self.is_reversed)
            .field("is_relative", &self.is_relative)
            .field("repetition", &self.repetition)
            .field("repeat_count", &self.repeat_count)
            .field("repeat_delay", &self.repeat_delay)
            .field("end_state", &self.end_state)
            .field("delegate", &self.delegate.is_some())
            .finish()
    }
}
