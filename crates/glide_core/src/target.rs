//! Animation targets
//!
//! A tween never knows what it animates. It talks to its target through the
//! [`TargetAdapter`] capability, which exposes a flat set of numeric
//! properties addressed by string key, and it holds that target only through
//! a [`WeakTarget`], so the animated object's lifetime stays with its owner.
//!
//! ```rust
//! use std::sync::Arc;
//! use glide_core::{PropertyStore, WeakTarget};
//!
//! let store = Arc::new(PropertyStore::with_values([("opacity", 1.0)]));
//! let weak = WeakTarget::new(&store);
//! assert!(weak.is_alive());
//!
//! drop(store);
//! assert!(weak.upgrade().is_none());
//! ```

use rustc_hash::FxHashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::error::{GlideError, Result};

/// Property key to value mapping
///
/// Used for the `from`/`to` bindings supplied when a tween is created and for
/// the values reported after each tick.
pub type PropertyMap = FxHashMap<String, f64>;

/// Build a [`PropertyMap`] from `(key, value)` pairs
pub fn property_map<K: Into<String>>(pairs: impl IntoIterator<Item = (K, f64)>) -> PropertyMap {
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Keyed numeric property access on an externally owned object
///
/// Implementations are called from whichever thread drives the ticks, so
/// they must do their own synchronization.
pub trait TargetAdapter: Send + Sync + 'static {
    /// Current value of `key`, or `None` if the target has no such property
    fn get(&self, key: &str) -> Option<f64>;

    /// Write `value` to `key`
    fn set(&self, key: &str, value: f64) -> Result<()>;
}

/// Identity of a target allocation
///
/// Derived from the address of the shared allocation, so two handles to the
/// same `Arc` compare equal while distinct objects never do (as long as both
/// are alive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(usize);

impl TargetId {
    pub fn of<T: ?Sized>(target: &Arc<T>) -> Self {
        Self(Arc::as_ptr(target) as *const () as usize)
    }

    pub fn value(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TargetId({:#x})", self.0)
    }
}

/// Non-owning handle to a target
#[derive(Clone)]
pub struct WeakTarget {
    inner: Weak<dyn TargetAdapter>,
    id: TargetId,
}

impl WeakTarget {
    pub fn new<T: TargetAdapter>(target: &Arc<T>) -> Self {
        let inner: Weak<dyn TargetAdapter> = Arc::downgrade(target) as Weak<dyn TargetAdapter>;
        Self {
            inner,
            id: TargetId::of(target),
        }
    }

    pub fn from_dyn(target: &Arc<dyn TargetAdapter>) -> Self {
        Self {
            inner: Arc::downgrade(target),
            id: TargetId::of(target),
        }
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    /// Resolve the target, or `None` once its owner has dropped it
    pub fn upgrade(&self) -> Option<Arc<dyn TargetAdapter>> {
        self.inner.upgrade()
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl std::fmt::Debug for WeakTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakTarget")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// A thread-safe keyed property store
///
/// The generic target for hosts that do not have a concrete object to
/// animate. Only keys that were declared with [`insert`](Self::insert) (or
/// at construction) can be written.
#[derive(Debug, Default)]
pub struct PropertyStore {
    values: RwLock<PropertyMap>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<K: Into<String>>(pairs: impl IntoIterator<Item = (K, f64)>) -> Self {
        Self {
            values: RwLock::new(property_map(pairs)),
        }
    }

    /// Declare `key` (or overwrite it) with an initial value
    pub fn insert(&self, key: impl Into<String>, value: f64) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<f64> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    /// Copy of every property and its current value
    pub fn snapshot(&self) -> PropertyMap {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TargetAdapter for PropertyStore {
    fn get(&self, key: &str) -> Option<f64> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }

    fn set(&self, key: &str, value: f64) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        match values.get_mut(key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(GlideError::UnknownProperty(key.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_property_store_get_set() {
        let store = PropertyStore::with_values([("x", 1.0), ("y", 2.0)]);

        assert_eq!(store.get("x"), Some(1.0));
        assert_eq!(store.get("z"), None);

        store.set("y", 5.0).unwrap();
        assert_eq!(store.get("y"), Some(5.0));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_property_store_rejects_undeclared_keys() {
        let store = PropertyStore::new();
        assert!(store.is_empty());

        let err = store.set("alpha", 0.5).unwrap_err();
        assert!(matches!(err, GlideError::UnknownProperty(ref key) if key == "alpha"));

        store.insert("alpha", 1.0);
        assert!(store.set("alpha", 0.5).is_ok());
        assert_eq!(store.remove("alpha"), Some(0.5));
    }

    #[test]
    fn test_snapshot() {
        let store = PropertyStore::with_values([("a", 1.0)]);
        store.insert("b", 2.0);

        assert_eq!(store.snapshot(), property_map([("a", 1.0), ("b", 2.0)]));
    }

    #[test]
    fn test_target_id_identity() {
        let a = Arc::new(PropertyStore::new());
        let b = Arc::new(PropertyStore::new());
        let a2 = a.clone();

        assert_eq!(TargetId::of(&a), TargetId::of(&a2));
        assert_ne!(TargetId::of(&a), TargetId::of(&b));

        let as_dyn: Arc<dyn TargetAdapter> = a.clone();
        assert_eq!(TargetId::of(&as_dyn), TargetId::of(&a));
    }

    #[test]
    fn test_weak_target_does_not_extend_lifetime() {
        let store = Arc::new(PropertyStore::with_values([("x", 3.0)]));
        let weak = WeakTarget::new(&store);

        assert_eq!(weak.id(), TargetId::of(&store));
        assert_eq!(weak.upgrade().and_then(|t| t.get("x")), Some(3.0));

        drop(store);
        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_weak_target_from_dyn() {
        let store: Arc<dyn TargetAdapter> = Arc::new(PropertyStore::with_values([("x", 1.0)]));
        let weak = WeakTarget::from_dyn(&store);
        assert!(weak.is_alive());
        assert_eq!(weak.id(), TargetId::of(&store));
    }
}
