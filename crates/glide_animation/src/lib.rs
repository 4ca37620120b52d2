//! Glide Animation
//!
//! Time-based tweening of numeric properties.
//!
//! # Features
//!
//! - **Easing**: sixteen named curves plus custom functions, each with a reverse
//! - **Tweens**: delays, relative and reversed values, pause with idle-time accounting
//! - **Repetition**: loop or mirror a tween any number of times, or forever
//! - **Registry**: thread-safe lookup and bulk stop by target or by name
//! - **Frame Ticker**: a background driver for hosts without a frame loop
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use glide_animation::{Ease, EndState, Registry, Tween, TweenOptions};
//! use glide_core::{property_map, ManualClock, PropertyMap, PropertyStore, TargetAdapter};
//!
//! let clock = Arc::new(ManualClock::new());
//! let registry = Registry::new(clock.clone());
//! let sprite = Arc::new(PropertyStore::with_values([("x", 0.0)]));
//!
//! let tween = Tween::new(
//!     &registry,
//!     &sprite,
//!     2.0,
//!     TweenOptions::new().with_ease(Ease::SmoothInOut),
//!     PropertyMap::default(),
//!     property_map([("x", 100.0)]),
//! );
//!
//! registry.tick(0.0);
//! clock.advance(1.0);
//! registry.tick(0.0);
//! assert_eq!(sprite.get("x"), Some(50.0));
//!
//! tween.stop(EndState::Final);
//! assert_eq!(sprite.get("x"), Some(100.0));
//! ```

pub mod easing;
pub mod options;
pub mod registry;
pub mod ticker;
pub mod tween;

pub use easing::{CustomEase, Ease, EaseFn};
pub use options::{EndState, Repetition, TweenDelegate, TweenOptions, REPEAT_FOREVER};
pub use registry::Registry;
pub use ticker::{FrameTicker, SubscriptionId, TickerConfig};
pub use tween::{Tween, TweenId, TweenPhase, UpdateCallback};
