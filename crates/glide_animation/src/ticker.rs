//! Frame ticker
//!
//! A background thread that calls its subscribers at a fixed frame rate,
//! for hosts without a display link of their own. [`FrameTicker::drive`]
//! subscribes a [`Registry`] so every live tween is ticked each frame.
//!
//! A frame that arrives much later than scheduled is treated as a
//! suspension (the process was stopped or the machine slept) and the
//! overshoot is handed to subscribers as background time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use glide_core::{GlideError, Result};
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, trace};

use crate::registry::Registry;

new_key_type! {
    pub struct SubscriptionId;
}

type Subscriber = Box<dyn FnMut(f64) + Send>;

/// Frame ticker settings
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickerConfig {
    /// Frames per second
    pub fps: u32,
    /// Frame gap, in seconds, above which the gap counts as suspension
    pub suspend_threshold: f64,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            suspend_threshold: 0.25,
        }
    }
}

impl TickerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_suspend_threshold(mut self, seconds: f64) -> Self {
        self.suspend_threshold = seconds;
        self
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}

struct Shared {
    subscribers: Mutex<SlotMap<SubscriptionId, Subscriber>>,
    running: AtomicBool,
}

impl Shared {
    fn subscribers(&self) -> MutexGuard<'_, SlotMap<SubscriptionId, Subscriber>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Calls subscribers once per frame on a dedicated thread
///
/// Subscribers run on the ticker thread with the subscriber list locked, so
/// they must not subscribe or unsubscribe themselves. They may shut the
/// ticker down, in which case the rest of that frame is skipped. Dropping the
/// ticker shuts it down.
pub struct FrameTicker {
    shared: Arc<Shared>,
    config: TickerConfig,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl FrameTicker {
    /// Spawn the ticker thread
    pub fn start(config: TickerConfig) -> Result<Self> {
        let shared = Arc::new(Shared {
            subscribers: Mutex::new(SlotMap::with_key()),
            running: AtomicBool::new(true),
        });

        let thread_shared = shared.clone();
        let handle = thread::Builder::new()
            .name("glide-ticker".into())
            .spawn(move || run(thread_shared, config))
            .map_err(GlideError::TickerSpawn)?;
        debug!("Frame ticker started at {} fps", config.fps);

        Ok(Self {
            shared,
            config,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn config(&self) -> TickerConfig {
        self.config
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Call `subscriber` every frame with the frame's background time
    pub fn subscribe<F>(&self, subscriber: F) -> Result<SubscriptionId>
    where
        F: FnMut(f64) + Send + 'static,
    {
        if !self.is_running() {
            return Err(GlideError::TickerStopped);
        }
        Ok(self.shared.subscribers().insert(Box::new(subscriber)))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.subscribers().remove(id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers().len()
    }

    /// Tick `registry` every frame for as long as it is alive
    pub fn drive(&self, registry: &Arc<Registry>) -> Result<SubscriptionId> {
        let registry = Arc::downgrade(registry);
        self.subscribe(move |background_time| {
            if let Some(registry) = registry.upgrade() {
                registry.tick(background_time);
            }
        })
    }

    /// Stop the thread and wait for the frame in progress to finish
    pub fn shutdown(&self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }

        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                // Called from a subscriber: the frame loop holds the list and
                // clears it once this frame returns
                debug!("Frame ticker stopping from its own thread");
                return;
            }
            let _ = handle.join();
        }
        self.shared.subscribers().clear();
        debug!("Frame ticker stopped");
    }
}

impl Drop for FrameTicker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for FrameTicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameTicker")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}

fn run(shared: Arc<Shared>, config: TickerConfig) {
    let interval = config.frame_interval();
    let mut last_frame = Instant::now();

    while shared.running.load(Ordering::Acquire) {
        thread::sleep(interval);

        let now = Instant::now();
        let gap = now.duration_since(last_frame).as_secs_f64();
        last_frame = now;

        let background_time = if gap > config.suspend_threshold {
            let suspended = (gap - interval.as_secs_f64()).max(0.0);
            trace!("Frame ticker resumed after {:.3}s", suspended);
            suspended
        } else {
            0.0
        };

        if !shared.running.load(Ordering::Acquire) {
            break;
        }
        for (_, subscriber) in shared.subscribers().iter_mut() {
            if !shared.running.load(Ordering::Acquire) {
                break;
            }
            subscriber(background_time);
        }
    }

    shared.subscribers().clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::TweenOptions;
    use crate::tween::Tween;
    use glide_core::{property_map, PropertyMap, PropertyStore, SystemClock, TargetAdapter};
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    #[test]
    fn test_config_defaults() {
        let config = TickerConfig::default();
        assert_eq!(config.fps, 60);
        assert_eq!(config.suspend_threshold, 0.25);
        assert_eq!(
            TickerConfig::new().with_fps(0).frame_interval(),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_subscribers_are_called() {
        let ticker = FrameTicker::start(TickerConfig::new().with_fps(200)).unwrap();
        let frames = Arc::new(AtomicUsize::new(0));
        let counter = frames.clone();
        let id = ticker
            .subscribe(move |_| {
                counter.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while frames.load(Ordering::Relaxed) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(frames.load(Ordering::Relaxed) >= 3);

        assert!(ticker.unsubscribe(id));
        assert!(!ticker.unsubscribe(id));
        assert_eq!(ticker.subscriber_count(), 0);
    }

    #[test]
    fn test_shutdown_rejects_subscribers() {
        let ticker = FrameTicker::start(TickerConfig::default()).unwrap();
        ticker.shutdown();
        ticker.shutdown();

        assert!(!ticker.is_running());
        assert!(matches!(
            ticker.subscribe(|_| {}),
            Err(GlideError::TickerStopped)
        ));
    }

    #[test]
    fn test_shutdown_from_subscriber() {
        let ticker = Arc::new(FrameTicker::start(TickerConfig::new().with_fps(200)).unwrap());
        let (tx, rx) = mpsc::channel();
        let handle = Arc::downgrade(&ticker);
        ticker
            .subscribe(move |_| {
                if let Some(ticker) = handle.upgrade() {
                    ticker.shutdown();
                }
                let _ = tx.send(());
            })
            .unwrap();

        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());

        let deadline = Instant::now() + Duration::from_secs(5);
        while ticker.subscriber_count() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(ticker.subscriber_count(), 0);
        assert!(!ticker.is_running());
        assert!(matches!(
            ticker.subscribe(|_| {}),
            Err(GlideError::TickerStopped)
        ));
    }

    #[test]
    fn test_drive_finishes_tweens() {
        let registry = Registry::new(Arc::new(SystemClock::new()));
        let target = Arc::new(PropertyStore::with_values([("x", 0.0)]));
        Tween::new(
            &registry,
            &target,
            0.05,
            TweenOptions::new(),
            PropertyMap::default(),
            property_map([("x", 1.0)]),
        );

        let ticker = FrameTicker::start(
            TickerConfig::new()
                .with_fps(200)
                .with_suspend_threshold(f64::INFINITY),
        )
        .unwrap();
        ticker.drive(&registry).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !registry.is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        assert!(registry.is_empty());
        assert_eq!(target.get("x"), Some(1.0));
    }
}
