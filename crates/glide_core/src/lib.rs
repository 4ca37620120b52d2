//! Glide Core
//!
//! Engine-independent primitives shared by the Glide animation crates:
//!
//! - **Clocks**: a monotonic time source the engine reads once per tick
//! - **Targets**: the keyed numeric property capability a tween writes through
//! - **Errors**: the error type surfaced by target adapters and drivers
//!
//! # Example
//!
//! ```rust
//! use glide_core::{PropertyStore, TargetAdapter};
//!
//! let store = PropertyStore::new();
//! store.insert("x", 0.0);
//! store.set("x", 42.0).unwrap();
//! assert_eq!(store.get("x"), Some(42.0));
//! ```

pub mod clock;
pub mod error;
pub mod target;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{GlideError, Result};
pub use target::{property_map, PropertyMap, PropertyStore, TargetAdapter, TargetId, WeakTarget};
