//! Tween registry
//!
//! The set of live tweens. Tweens register themselves on construction and
//! leave on stop; the registry is what hosts tick and what lookups and bulk
//! stops go through. It is safe to use from any thread.
//!
//! Tweens are always stopped and ticked outside the registry lock, so
//! notifications raised from inside them can call back into the registry.

use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use glide_core::{Clock, SystemClock, TargetId};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::options::EndState;
use crate::tween::{Tween, TweenId};

static GLOBAL_REGISTRY: OnceLock<Arc<Registry>> = OnceLock::new();

pub struct Registry {
    clock: Arc<dyn Clock>,
    tweens: RwLock<FxHashMap<TweenId, Tween>>,
}

impl Registry {
    pub fn new(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            clock,
            tweens: RwLock::new(FxHashMap::default()),
        })
    }

    /// Process-wide registry on the system clock, created on first use
    pub fn global() -> &'static Arc<Registry> {
        GLOBAL_REGISTRY.get_or_init(|| Registry::new(Arc::new(SystemClock::new())))
    }

    /// The clock tweens in this registry read
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub(crate) fn insert(&self, tween: Tween) {
        self.write().insert(tween.id(), tween);
    }

    /// Drop a tween from the live set without stopping it
    ///
    /// The tween stops being ticked and found, and its end values are not
    /// written. Returns the removed handle.
    pub fn remove(&self, id: TweenId) -> Option<Tween> {
        self.write().remove(&id)
    }

    pub fn contains(&self, id: TweenId) -> bool {
        self.read().contains_key(&id)
    }

    pub fn get(&self, id: TweenId) -> Option<Tween> {
        self.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every live tween
    pub fn tweens(&self) -> Vec<Tween> {
        self.read().values().cloned().collect()
    }

    /// Live tweens animating `target`
    pub fn tweens_with_target<T: ?Sized>(&self, target: &Arc<T>) -> Vec<Tween> {
        self.collect(|tween| tween.targets(target))
    }

    /// Live tweens animating the target identified by `id`
    ///
    /// Tweens whose target has been dropped are left out, as with
    /// [`tweens_with_target`](Self::tweens_with_target).
    pub fn tweens_with_target_id(&self, id: TargetId) -> Vec<Tween> {
        self.collect(|tween| tween.targets_id(id))
    }

    /// Live tweens created with `name`
    pub fn tweens_with_name(&self, name: &str) -> Vec<Tween> {
        self.collect(|tween| tween.name() == Some(name))
    }

    /// Stop every live tween animating `target`, returning how many stopped
    pub fn stop_tweens_with_target<T: ?Sized>(
        &self,
        target: &Arc<T>,
        end_state: EndState,
    ) -> usize {
        let tweens = self.tweens_with_target(target);
        debug!(
            "Stopping {} tweens with target {}",
            tweens.len(),
            TargetId::of(target)
        );
        stop_each(tweens, end_state)
    }

    /// Stop every live tween created with `name`, returning how many stopped
    pub fn stop_tweens_with_name(&self, name: &str, end_state: EndState) -> usize {
        let tweens = self.tweens_with_name(name);
        debug!("Stopping {} tweens named '{}'", tweens.len(), name);
        stop_each(tweens, end_state)
    }

    pub fn stop_all(&self, end_state: EndState) -> usize {
        let tweens = self.tweens();
        debug!("Stopping all {} tweens", tweens.len());
        stop_each(tweens, end_state)
    }

    /// Tick every live tween once
    ///
    /// Tweens registered by a notification during this pass are first ticked
    /// on the next one.
    pub fn tick(&self, background_time: f64) {
        for tween in self.tweens() {
            tween.tick(background_time);
        }
    }

    fn collect(&self, mut predicate: impl FnMut(&Tween) -> bool) -> Vec<Tween> {
        self.read()
            .values()
            .filter(|tween| predicate(tween))
            .cloned()
            .collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, FxHashMap<TweenId, Tween>> {
        self.tweens.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FxHashMap<TweenId, Tween>> {
        self.tweens.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("tweens", &self.len())
            .finish()
    }
}

fn stop_each(tweens: Vec<Tween>, end_state: EndState) -> usize {
    let mut stopped = 0;
    for tween in tweens {
        if !tween.is_stopped() {
            tween.stop(end_state);
            stopped += 1;
        }
    }
    stopped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::TweenOptions;
    use glide_core::{property_map, ManualClock, PropertyMap, PropertyStore, TargetAdapter};
    use pretty_assertions::assert_eq;

    fn registry() -> (Arc<ManualClock>, Arc<Registry>) {
        let clock = Arc::new(ManualClock::new());
        (clock.clone(), Registry::new(clock))
    }

    fn tween_on(
        registry: &Arc<Registry>,
        target: &Arc<PropertyStore>,
        name: Option<&str>,
    ) -> Tween {
        let mut options = TweenOptions::new();
        if let Some(name) = name {
            options = options.with_name(name);
        }
        Tween::new(
            registry,
            target,
            1.0,
            options,
            PropertyMap::default(),
            property_map([("x", 10.0)]),
        )
    }

    #[test]
    fn test_registration() {
        let (_, registry) = registry();
        let target = Arc::new(PropertyStore::with_values([("x", 0.0)]));
        let tween = tween_on(&registry, &target, None);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(tween.id()), Some(tween.clone()));

        assert!(registry.remove(tween.id()).is_some());
        assert!(registry.is_empty());
        assert!(registry.remove(tween.id()).is_none());
    }

    #[test]
    fn test_lookup_by_target() {
        let (_, registry) = registry();
        let a = Arc::new(PropertyStore::with_values([("x", 0.0)]));
        let b = Arc::new(PropertyStore::with_values([("x", 0.0)]));
        let on_a = tween_on(&registry, &a, None);
        let on_b = tween_on(&registry, &b, None);

        assert_eq!(registry.tweens_with_target(&a), vec![on_a.clone()]);
        assert_eq!(registry.tweens_with_target_id(TargetId::of(&b)), vec![on_b]);

        let as_dyn: Arc<dyn TargetAdapter> = a.clone();
        assert_eq!(registry.tweens_with_target(&as_dyn), vec![on_a]);
    }

    #[test]
    fn test_target_lookups_skip_released_targets() {
        let (_, registry) = registry();
        let target = Arc::new(PropertyStore::with_values([("x", 0.0)]));
        let id = TargetId::of(&target);
        let tween = tween_on(&registry, &target, None);
        assert_eq!(registry.tweens_with_target_id(id), vec![tween]);

        drop(target);

        // Still registered until its next tick notices
        assert_eq!(registry.len(), 1);
        assert!(registry.tweens_with_target_id(id).is_empty());
    }

    #[test]
    fn test_lookup_by_name() {
        let (_, registry) = registry();
        let target = Arc::new(PropertyStore::with_values([("x", 0.0)]));
        let fade = tween_on(&registry, &target, Some("fade"));
        tween_on(&registry, &target, Some("slide"));
        tween_on(&registry, &target, None);

        assert_eq!(registry.tweens_with_name("fade"), vec![fade]);
        assert!(registry.tweens_with_name("missing").is_empty());
    }

    #[test]
    fn test_stop_by_target_counts() {
        let (_, registry) = registry();
        let a = Arc::new(PropertyStore::with_values([("x", 0.0)]));
        let b = Arc::new(PropertyStore::with_values([("x", 0.0)]));
        tween_on(&registry, &a, None);
        tween_on(&registry, &a, None);
        let survivor = tween_on(&registry, &b, None);

        assert_eq!(registry.stop_tweens_with_target(&a, EndState::Final), 2);
        assert_eq!(a.get("x"), Some(10.0));
        assert_eq!(registry.tweens(), vec![survivor]);
        assert_eq!(registry.stop_tweens_with_target(&a, EndState::Final), 0);
    }

    #[test]
    fn test_stop_all() {
        let (_, registry) = registry();
        let target = Arc::new(PropertyStore::with_values([("x", 0.0)]));
        tween_on(&registry, &target, Some("a"));
        tween_on(&registry, &target, Some("b"));

        assert_eq!(registry.stop_all(EndState::Current), 2);
        assert!(registry.is_empty());
        assert_eq!(target.get("x"), Some(0.0));
    }

    #[test]
    fn test_tick_drives_every_tween() {
        let (clock, registry) = registry();
        let a = Arc::new(PropertyStore::with_values([("x", 0.0)]));
        let b = Arc::new(PropertyStore::with_values([("x", 0.0)]));
        tween_on(&registry, &a, None);
        tween_on(&registry, &b, None);

        registry.tick(0.0);
        clock.advance(0.5);
        registry.tick(0.0);

        assert_eq!(a.get("x"), Some(5.0));
        assert_eq!(b.get("x"), Some(5.0));

        clock.advance(0.5);
        registry.tick(0.0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dropped_registry_leaves_tweens_inert() {
        let (clock, registry) = registry();
        let target = Arc::new(PropertyStore::with_values([("x", 0.0)]));
        let tween = tween_on(&registry, &target, None);
        drop(registry);

        clock.advance(0.5);
        tween.tick(0.0);
        assert_eq!(target.get("x"), Some(0.0));
        assert!(!tween.is_live());
    }

    #[test]
    fn test_global_is_shared() {
        assert!(Arc::ptr_eq(Registry::global(), Registry::global()));
    }
}
