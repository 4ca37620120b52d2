//! Tweens
//!
//! A [`Tween`] interpolates a set of numeric properties on a target from
//! start values to end values over a duration. It is driven by repeated
//! calls to [`Tween::tick`], normally through [`Registry::tick`], and moves
//! through four phases:
//!
//! - **Starting**: nothing has been interpolated in the first cycle yet
//! - **Updating**: somewhere inside a cycle
//! - **Repeating**: between two cycles
//! - **Ending**: the last cycle has reached its duration
//!
//! Each tick reads the clock, subtracts idle time (pauses and time the host
//! reported as suspended), waits out the applicable delay, writes the eased
//! values through the target and raises lifecycle notifications. When a
//! cycle completes the tween either stops or starts another cycle, mirroring
//! its interpolation endpoints if asked to.
//!
//! Notifications are always raised with no engine lock held.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use glide_core::{Clock, GlideError, PropertyMap, TargetAdapter, TargetId, WeakTarget};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::easing::Ease;
use crate::options::{EndState, TweenDelegate, TweenOptions, REPEAT_FOREVER};
use crate::registry::Registry;

static NEXT_TWEEN_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique tween identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenId(u64);

impl TweenId {
    fn next() -> Self {
        Self(NEXT_TWEEN_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TweenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TweenId({})", self.0)
    }
}

/// Where a tween is in its timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweenPhase {
    Starting,
    Updating,
    Repeating,
    Ending,
}

/// Receives every set of values a tween writes
pub type UpdateCallback = Arc<dyn Fn(&Tween, &PropertyMap) + Send + Sync>;

/// Interpolation endpoints of one property for the active cycle
#[derive(Debug, Clone, PartialEq)]
struct Binding {
    key: String,
    start: f64,
    delta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hook {
    WillStart,
    WillRepeat,
    WillFinish,
}

impl Hook {
    fn dispatch(self, delegate: &dyn TweenDelegate, tween: &Tween) {
        match self {
            Hook::WillStart => delegate.will_start(tween),
            Hook::WillRepeat => delegate.will_repeat(tween),
            Hook::WillFinish => delegate.will_finish(tween),
        }
    }
}

/// Resolved target for one operation
enum TargetRef {
    /// Callback-only tween
    Detached,
    Live(Arc<dyn TargetAdapter>),
    Released,
}

impl TargetRef {
    fn adapter(&self) -> Option<&dyn TargetAdapter> {
        match self {
            TargetRef::Live(target) => Some(target.as_ref()),
            TargetRef::Detached | TargetRef::Released => None,
        }
    }
}

struct TweenState {
    options: TweenOptions,
    from: PropertyMap,
    to: PropertyMap,
    /// Target values read at construction, for relative tweens
    relative_base: PropertyMap,
    bindings: SmallVec<[Binding; 4]>,

    begin_time: Option<f64>,
    current_time: f64,
    /// Start of the current delay window
    last_time: f64,
    idle_time: f64,
    paused_at: Option<f64>,
    delta_time: f64,
    current_cycle: u32,

    /// A value write has happened in the current cycle
    cycle_ticked: bool,
    /// A value write has happened since construction or restart
    started: bool,
    is_ready: bool,
    is_mirrored: bool,
    stopped: bool,
    /// Bumped by restart so the rest of an in-flight tick can be discarded
    generation: u64,

    on_update: Option<UpdateCallback>,
}

impl TweenState {
    fn is_final_cycle(&self) -> bool {
        let count = self.options.effective_repeat_count();
        count != REPEAT_FOREVER && self.current_cycle >= count
    }

    /// Continue from the current end point back to the current start point
    fn fold_mirror(&mut self) {
        for binding in self.bindings.iter_mut() {
            binding.start += binding.delta;
            binding.delta = -binding.delta;
        }
    }

    fn revert_mirror(&mut self) {
        self.fold_mirror();
        self.is_mirrored = false;
        if self.options.repetition.reverses_ease() {
            self.options.ease = self.options.ease.reversed();
        }
    }
}

struct TweenInner {
    id: TweenId,
    name: Option<String>,
    target: Option<WeakTarget>,
    duration: f64,
    clock: Arc<dyn Clock>,
    registry: Weak<Registry>,
    ticking: AtomicBool,
    state: Mutex<TweenState>,
}

/// Handle to a running tween
///
/// Cloning is cheap and every clone refers to the same tween. Two handles
/// are equal only if they refer to the same tween.
#[derive(Clone)]
pub struct Tween {
    inner: Arc<TweenInner>,
}

impl Tween {
    /// Create a tween on `target`, register it and seed the start values
    ///
    /// Keys present in only one of `from`/`to` take the other side from the
    /// target's live value. A `duration` of zero or less completes on the
    /// first tick.
    pub fn new<T: TargetAdapter>(
        registry: &Arc<Registry>,
        target: &Arc<T>,
        duration: f64,
        options: TweenOptions,
        from: PropertyMap,
        to: PropertyMap,
    ) -> Self {
        Self::build(
            registry,
            Some(WeakTarget::new(target)),
            duration,
            options,
            from,
            to,
            None,
        )
    }

    /// Create a tween on a type-erased target
    pub fn for_target(
        registry: &Arc<Registry>,
        target: &Arc<dyn TargetAdapter>,
        duration: f64,
        options: TweenOptions,
        from: PropertyMap,
        to: PropertyMap,
    ) -> Self {
        Self::build(
            registry,
            Some(WeakTarget::from_dyn(target)),
            duration,
            options,
            from,
            to,
            None,
        )
    }

    /// Create a tween without a target that only reports its values
    ///
    /// Values missing from `from` or `to` are taken as `0.0`.
    pub fn with_callback<F>(
        registry: &Arc<Registry>,
        duration: f64,
        options: TweenOptions,
        from: PropertyMap,
        to: PropertyMap,
        callback: F,
    ) -> Self
    where
        F: Fn(&Tween, &PropertyMap) + Send + Sync + 'static,
    {
        Self::build(
            registry,
            None,
            duration,
            options,
            from,
            to,
            Some(Arc::new(callback)),
        )
    }

    fn build(
        registry: &Arc<Registry>,
        target: Option<WeakTarget>,
        duration: f64,
        options: TweenOptions,
        from: PropertyMap,
        to: PropertyMap,
        on_update: Option<UpdateCallback>,
    ) -> Self {
        let clock = registry.clock().clone();
        let now = clock.now();
        let live = target.as_ref().and_then(WeakTarget::upgrade);

        let relative_base = if options.is_relative {
            bound_keys(&from, &to)
                .into_iter()
                .map(|key| {
                    let value = live.as_ref().and_then(|t| t.get(&key)).unwrap_or(0.0);
                    (key, value)
                })
                .collect()
        } else {
            PropertyMap::default()
        };

        let paused = options.is_paused;
        let state = TweenState {
            options,
            from,
            to,
            relative_base,
            bindings: SmallVec::new(),
            begin_time: None,
            current_time: now,
            last_time: now,
            idle_time: 0.0,
            paused_at: paused.then_some(now),
            delta_time: 0.0,
            current_cycle: 0,
            cycle_ticked: false,
            started: false,
            is_ready: false,
            is_mirrored: false,
            stopped: false,
            generation: 0,
            on_update,
        };

        let name = state.options.name.clone();
        let tween = Tween {
            inner: Arc::new(TweenInner {
                id: TweenId::next(),
                name,
                target,
                duration: duration.max(0.0),
                clock,
                registry: Arc::downgrade(registry),
                ticking: AtomicBool::new(false),
                state: Mutex::new(state),
            }),
        };

        registry.insert(tween.clone());
        debug!(
            "Tween {} registered (name: {:?}, duration: {:.3}s, paused: {})",
            tween.id(),
            tween.name(),
            tween.duration(),
            paused
        );

        if !paused {
            let target = tween.target_ref();
            let mut state = tween.lock();
            tween.snapshot(&mut state, target.adapter());
        }

        tween
    }

    /// Register a callback that receives every set of written values
    pub fn on_update<F>(&self, callback: F)
    where
        F: Fn(&Tween, &PropertyMap) + Send + Sync + 'static,
    {
        self.lock().on_update = Some(Arc::new(callback));
    }

    // =========================================================================
    // Ticking
    // =========================================================================

    /// Advance the tween
    ///
    /// `background_time` is wall-clock time, in seconds, during which the
    /// host was suspended since the previous tick; it is excluded from the
    /// tween's elapsed time. A tick that arrives while another tick of the
    /// same tween is still running is ignored.
    pub fn tick(&self, background_time: f64) {
        let Some(_guard) = TickGuard::acquire(&self.inner.ticking) else {
            return;
        };
        if !self.is_registered() {
            return;
        }

        let target = self.target_ref();
        if matches!(target, TargetRef::Released) {
            debug!("Tween {} lost its target", self.id());
            self.halt(EndState::Current, true);
            return;
        }

        let now = self.inner.clock.now();
        let duration = self.inner.duration;

        let (hook, delegate, generation) = {
            let mut state = self.lock();
            if state.stopped || state.options.is_paused {
                return;
            }

            state.idle_time += background_time.max(0.0);
            state.current_time = now - state.idle_time;

            let begin = match state.begin_time {
                Some(begin) => begin,
                None => {
                    let delay = if state.current_cycle == 0 {
                        state.options.delay
                    } else {
                        state.options.repeat_delay
                    };
                    if state.current_time - state.last_time < delay {
                        return;
                    }
                    state.begin_time = Some(state.current_time);
                    state.current_time
                }
            };
            state.delta_time = (state.current_time - begin).clamp(0.0, duration);

            let hook = if !state.cycle_ticked {
                if state.current_cycle == 0 {
                    Some(Hook::WillStart)
                } else {
                    Some(Hook::WillRepeat)
                }
            } else if state.delta_time >= duration && state.is_final_cycle() {
                Some(Hook::WillFinish)
            } else {
                None
            };
            (hook, state.options.delegate.clone(), state.generation)
        };

        if let (Some(hook), Some(delegate)) = (hook, delegate.as_deref()) {
            hook.dispatch(delegate, self);
        }

        if !self.is_registered() {
            return;
        }
        let (values, first_tick, completes, final_cycle, on_update) = {
            let mut guard = self.lock();
            // A hook may have stopped, paused or restarted the tween
            if guard.stopped || guard.options.is_paused || guard.generation != generation {
                return;
            }
            let state = &mut *guard;
            let adapter = target.adapter();
            if !state.is_ready {
                self.snapshot(state, adapter);
            }

            let mut values = PropertyMap::default();
            for binding in state.bindings.iter() {
                let value =
                    state
                        .options
                        .ease
                        .apply(binding.start, binding.delta, state.delta_time, duration);
                self.write(adapter, &binding.key, value);
                values.insert(binding.key.clone(), value);
            }

            let first_tick = !state.started;
            state.started = true;
            state.cycle_ticked = true;
            (
                values,
                first_tick,
                state.delta_time >= duration,
                state.is_final_cycle(),
                state.on_update.clone(),
            )
        };

        if let Some(callback) = on_update {
            callback(self, &values);
        }
        if let Some(delegate) = delegate.as_deref() {
            if first_tick {
                delegate.did_start(self);
            }
            if completes {
                if final_cycle {
                    delegate.did_finish(self);
                } else {
                    delegate.did_repeat(self);
                }
            }
        }

        if completes {
            self.complete_cycle(generation);
        }
    }

    /// Finish the current cycle: stop after the last one, otherwise set up
    /// the next one
    fn complete_cycle(&self, generation: u64) {
        let end_state = {
            let mut state = self.lock();
            if state.stopped || state.generation != generation {
                return;
            }
            if state.is_final_cycle() {
                Some(state.options.end_state)
            } else {
                state.begin_time = None;
                state.last_time = state.current_time;
                state.delta_time = 0.0;
                state.cycle_ticked = false;
                state.current_cycle = state.current_cycle.saturating_add(1);

                if state.options.repetition.is_mirror() {
                    state.is_mirrored = !state.is_mirrored;
                    state.fold_mirror();
                    if state.options.repetition.reverses_ease() {
                        state.options.ease = state.options.ease.reversed();
                    }
                }
                trace!(
                    "Tween {} entering cycle {} (mirrored: {})",
                    self.id(),
                    state.current_cycle,
                    state.is_mirrored
                );
                None
            }
        };

        if let Some(end_state) = end_state {
            self.halt(end_state, false);
        }
    }

    /// Read the target and compute the first cycle's endpoints, then write
    /// the start values
    fn snapshot(&self, state: &mut TweenState, target: Option<&dyn TargetAdapter>) {
        let read = |key: &str| target.and_then(|t| t.get(key)).unwrap_or(0.0);

        let mut bindings = SmallVec::new();
        for key in bound_keys(&state.from, &state.to) {
            let (from, to) = if state.options.is_relative {
                let base = state.relative_base.get(&key).copied().unwrap_or(0.0);
                (
                    base + state.from.get(&key).copied().unwrap_or(0.0),
                    base + state.to.get(&key).copied().unwrap_or(0.0),
                )
            } else {
                (
                    state.from.get(&key).copied().unwrap_or_else(|| read(&key)),
                    state.to.get(&key).copied().unwrap_or_else(|| read(&key)),
                )
            };

            let (start, delta) = if state.options.is_reversed {
                (to, from - to)
            } else {
                (from, to - from)
            };
            self.write(target, &key, start);
            bindings.push(Binding { key, start, delta });
        }

        state.bindings = bindings;
        state.is_ready = true;
    }

    fn write(&self, target: Option<&dyn TargetAdapter>, key: &str, value: f64) {
        if let Some(target) = target {
            if let Err(err) = target.set(key, value) {
                warn!("Tween {} failed to write '{}': {}", self.id(), key, err);
            }
        }
    }

    // =========================================================================
    // Control
    // =========================================================================

    /// Pause or resume
    ///
    /// Time spent paused is added to the tween's idle time on resume, so the
    /// timeline continues where it left off.
    pub fn set_paused(&self, paused: bool) {
        let mut state = self.lock();
        if state.options.is_paused == paused {
            return;
        }

        let now = self.inner.clock.now();
        if paused {
            state.paused_at = Some(now);
        } else if let Some(paused_at) = state.paused_at.take() {
            state.idle_time += (now - paused_at).max(0.0);
        }
        state.options.is_paused = paused;
        trace!("Tween {} paused: {}", self.id(), paused);
    }

    pub fn pause(&self) {
        self.set_paused(true);
    }

    pub fn resume(&self) {
        self.set_paused(false);
    }

    /// Return to the unstarted state and write the start values back
    ///
    /// Keeps the paused flag and the registration.
    pub fn restart(&self) {
        let target = self.target_ref();
        let now = self.inner.clock.now();

        let mut guard = self.lock();
        let state = &mut *guard;
        state.generation = state.generation.wrapping_add(1);
        if state.is_mirrored {
            state.revert_mirror();
        }

        state.begin_time = None;
        state.current_time = now;
        state.last_time = now;
        state.idle_time = 0.0;
        state.delta_time = 0.0;
        state.current_cycle = 0;
        state.cycle_ticked = false;
        state.started = false;
        if state.options.is_paused {
            state.paused_at = Some(now);
        }

        if state.is_ready {
            let adapter = target.adapter();
            for binding in state.bindings.iter() {
                self.write(adapter, &binding.key, binding.start);
            }
        }
        debug!("Tween {} restarted", self.id());
    }

    /// Deregister and stop ticking
    ///
    /// With [`EndState::Final`] the end values are written, snapshotting the
    /// target first if the tween never got to. Stopping twice does nothing.
    pub fn stop(&self, end_state: EndState) {
        self.halt(end_state, true);
    }

    fn halt(&self, end_state: EndState, revert_mirror: bool) {
        if let Some(registry) = self.inner.registry.upgrade() {
            registry.remove(self.id());
        }

        let (values, on_update) = {
            let mut guard = self.lock();
            if guard.stopped {
                return;
            }
            guard.stopped = true;
            debug!("Tween {} stopped ({:?})", self.id(), end_state);

            if end_state == EndState::Current {
                return;
            }

            let target = self.target_ref();
            let adapter = target.adapter();
            let state = &mut *guard;
            if revert_mirror && state.is_mirrored {
                state.revert_mirror();
            }
            if !state.is_ready {
                self.snapshot(state, adapter);
            }

            let mut values = PropertyMap::default();
            for binding in state.bindings.iter() {
                let value = binding.start + binding.delta;
                self.write(adapter, &binding.key, value);
                values.insert(binding.key.clone(), value);
            }
            (values, state.on_update.clone())
        };

        if let Some(callback) = on_update {
            callback(self, &values);
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn id(&self) -> TweenId {
        self.inner.id
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn duration(&self) -> f64 {
        self.inner.duration
    }

    /// Identity of the target, `None` for callback-only tweens
    pub fn target_id(&self) -> Option<TargetId> {
        self.inner.target.as_ref().map(WeakTarget::id)
    }

    /// The animated target, `Ok(None)` for callback-only tweens
    pub fn target(&self) -> glide_core::Result<Option<Arc<dyn TargetAdapter>>> {
        match self.target_ref() {
            TargetRef::Detached => Ok(None),
            TargetRef::Live(target) => Ok(Some(target)),
            TargetRef::Released => Err(GlideError::TargetReleased),
        }
    }

    /// Whether this tween animates `target`
    pub fn targets<T: ?Sized>(&self, target: &Arc<T>) -> bool {
        self.targets_id(TargetId::of(target))
    }

    /// Whether this tween animates the live target identified by `id`
    pub fn targets_id(&self, id: TargetId) -> bool {
        self.inner
            .target
            .as_ref()
            .is_some_and(|weak| weak.is_alive() && weak.id() == id)
    }

    /// Elapsed time within the active cycle, in `[0, duration]`
    pub fn delta_time(&self) -> f64 {
        self.lock().delta_time
    }

    pub fn current_cycle(&self) -> u32 {
        self.lock().current_cycle
    }

    pub fn idle_time(&self) -> f64 {
        self.lock().idle_time
    }

    pub fn is_ready(&self) -> bool {
        self.lock().is_ready
    }

    pub fn is_mirrored(&self) -> bool {
        self.lock().is_mirrored
    }

    pub fn is_paused(&self) -> bool {
        self.lock().options.is_paused
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Registered and not stopped
    pub fn is_live(&self) -> bool {
        !self.is_stopped() && self.is_registered()
    }

    /// The ease currently in use, which mirroring may have reversed
    pub fn ease(&self) -> Ease {
        self.lock().options.ease.clone()
    }

    pub fn options(&self) -> TweenOptions {
        self.lock().options.clone()
    }

    /// `(start, delta)` of `key` for the active cycle
    pub fn interpolation(&self, key: &str) -> Option<(f64, f64)> {
        self.lock()
            .bindings
            .iter()
            .find(|binding| binding.key == key)
            .map(|binding| (binding.start, binding.delta))
    }

    pub fn phase(&self) -> TweenPhase {
        let state = self.lock();
        if state.cycle_ticked && state.delta_time >= self.inner.duration {
            if state.is_final_cycle() {
                TweenPhase::Ending
            } else {
                TweenPhase::Repeating
            }
        } else if state.delta_time <= 0.0 {
            if state.current_cycle == 0 {
                TweenPhase::Starting
            } else {
                TweenPhase::Repeating
            }
        } else {
            TweenPhase::Updating
        }
    }

    fn is_registered(&self) -> bool {
        self.inner
            .registry
            .upgrade()
            .is_some_and(|registry| registry.contains(self.id()))
    }

    fn target_ref(&self) -> TargetRef {
        match &self.inner.target {
            None => TargetRef::Detached,
            Some(weak) => match weak.upgrade() {
                Some(target) => TargetRef::Live(target),
                None => TargetRef::Released,
            },
        }
    }

    fn lock(&self) -> MutexGuard<'_, TweenState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for Tween {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Tween {}

impl std::hash::Hash for Tween {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl std::fmt::Debug for Tween {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tween")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("duration", &self.inner.duration)
            .field("target", &self.inner.target)
            .finish()
    }
}

/// Every key bound by either side, sorted so writes happen in a stable order
fn bound_keys(from: &PropertyMap, to: &PropertyMap) -> Vec<String> {
    let mut keys: Vec<String> = from.keys().chain(to.keys()).cloned().collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}

/// Marks a tween as mid-tick for as long as it lives
struct TickGuard<'a>(&'a AtomicBool);

impl<'a> TickGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
