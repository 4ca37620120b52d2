//! Easing functions for tweens
//!
//! Every curve maps normalized progress `t` in `[0, 1]` to an output whose
//! endpoints are exact: `progress(0) == 0` and `progress(1) == 1`. Elastic,
//! back and bounce curves overshoot in between.

use std::f64::consts::PI;
use std::sync::Arc;

/// A user-supplied progress function
pub type EaseFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Easing curve
#[derive(Clone, Default)]
pub enum Ease {
    #[default]
    Linear,
    /// Quadratic
    SmoothIn,
    SmoothOut,
    SmoothInOut,
    /// Quintic
    StrongIn,
    StrongOut,
    StrongInOut,
    ElasticIn,
    ElasticOut,
    ElasticInOut,
    BounceIn,
    BounceOut,
    BounceInOut,
    BackIn,
    BackOut,
    BackInOut,
    Custom(CustomEase),
}

/// A custom curve, optionally paired with its reverse
#[derive(Clone)]
pub struct CustomEase {
    forward: EaseFn,
    reverse: Option<EaseFn>,
}

impl Ease {
    /// Every named curve, in declaration order
    pub const NAMED: [Ease; 16] = [
        Ease::Linear,
        Ease::SmoothIn,
        Ease::SmoothOut,
        Ease::SmoothInOut,
        Ease::StrongIn,
        Ease::StrongOut,
        Ease::StrongInOut,
        Ease::ElasticIn,
        Ease::ElasticOut,
        Ease::ElasticInOut,
        Ease::BounceIn,
        Ease::BounceOut,
        Ease::BounceInOut,
        Ease::BackIn,
        Ease::BackOut,
        Ease::BackInOut,
    ];

    /// Wrap a progress function. The resulting curve is its own reverse.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Ease::Custom(CustomEase {
            forward: Arc::new(f),
            reverse: None,
        })
    }

    /// Wrap a progress function together with the curve it reverses to
    pub fn custom_pair<F, R>(forward: F, reverse: R) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
        R: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Ease::Custom(CustomEase {
            forward: Arc::new(forward),
            reverse: Some(Arc::new(reverse)),
        })
    }

    /// Apply the curve to a progress value (0.0 to 1.0)
    pub fn progress(&self, t: f64) -> f64 {
        // Endpoints are always exact
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }

        match self {
            Ease::Linear => t,
            Ease::SmoothIn => t * t,
            Ease::SmoothOut => 1.0 - (1.0 - t) * (1.0 - t),
            Ease::SmoothInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Ease::StrongIn => t.powi(5),
            Ease::StrongOut => 1.0 - (1.0 - t).powi(5),
            Ease::StrongInOut => {
                if t < 0.5 {
                    16.0 * t.powi(5)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(5) / 2.0
                }
            }
            Ease::ElasticIn => elastic_in(t),
            Ease::ElasticOut => elastic_out(t),
            Ease::ElasticInOut => elastic_in_out(t),
            Ease::BounceIn => 1.0 - bounce_out(1.0 - t),
            Ease::BounceOut => bounce_out(t),
            Ease::BounceInOut => {
                if t < 0.5 {
                    (1.0 - bounce_out(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + bounce_out(2.0 * t - 1.0)) / 2.0
                }
            }
            Ease::BackIn => back_in(t),
            Ease::BackOut => back_out(t),
            Ease::BackInOut => back_in_out(t),
            Ease::Custom(custom) => (custom.forward)(t),
        }
    }

    /// Value at `time` of a tween from `begin` moving by `change` over `duration`
    ///
    /// A non-positive `duration` counts as already elapsed.
    pub fn apply(&self, begin: f64, change: f64, time: f64, duration: f64) -> f64 {
        if duration <= 0.0 {
            return begin + change;
        }
        begin + change * self.progress(time / duration)
    }

    /// The curve that traverses this one backwards in time
    ///
    /// `In` and `Out` swap; `InOut`, linear and unpaired custom curves map to
    /// themselves.
    pub fn reversed(&self) -> Ease {
        match self {
            Ease::SmoothIn => Ease::SmoothOut,
            Ease::SmoothOut => Ease::SmoothIn,
            Ease::StrongIn => Ease::StrongOut,
            Ease::StrongOut => Ease::StrongIn,
            Ease::ElasticIn => Ease::ElasticOut,
            Ease::ElasticOut => Ease::ElasticIn,
            Ease::BounceIn => Ease::BounceOut,
            Ease::BounceOut => Ease::BounceIn,
            Ease::BackIn => Ease::BackOut,
            Ease::BackOut => Ease::BackIn,
            Ease::Custom(CustomEase {
                forward,
                reverse: Some(reverse),
            }) => Ease::Custom(CustomEase {
                forward: reverse.clone(),
                reverse: Some(forward.clone()),
            }),
            other => other.clone(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Ease::Linear => "linear",
            Ease::SmoothIn => "smoothIn",
            Ease::SmoothOut => "smoothOut",
            Ease::SmoothInOut => "smoothInOut",
            Ease::StrongIn => "strongIn",
            Ease::StrongOut => "strongOut",
            Ease::StrongInOut => "strongInOut",
            Ease::ElasticIn => "elasticIn",
            Ease::ElasticOut => "elasticOut",
            Ease::ElasticInOut => "elasticInOut",
            Ease::BounceIn => "bounceIn",
            Ease::BounceOut => "bounceOut",
            Ease::BounceInOut => "bounceInOut",
            Ease::BackIn => "backIn",
            Ease::BackOut => "backOut",
            Ease::BackInOut => "backInOut",
            Ease::Custom(_) => "custom",
        }
    }
}

impl PartialEq for Ease {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Ease::Custom(a), Ease::Custom(b)) => {
                Arc::ptr_eq(&a.forward, &b.forward)
                    && match (&a.reverse, &b.reverse) {
                        (Some(x), Some(y)) => Arc::ptr_eq(x, y),
                        (None, None) => true,
                        _ => false,
                    }
            }
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl std::fmt::Debug for Ease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ease::Custom(custom) => f
                .debug_struct("Custom")
                .field("paired", &custom.reverse.is_some())
                .finish(),
            named => f.write_str(named.name()),
        }
    }
}

const BACK_OVERSHOOT: f64 = 1.70158;

fn elastic_in(t: f64) -> f64 {
    -(2.0_f64).powf(10.0 * t - 10.0) * ((t * 10.0 - 10.75) * (2.0 * PI / 3.0)).sin()
}

fn elastic_out(t: f64) -> f64 {
    (2.0_f64).powf(-10.0 * t) * ((t * 10.0 - 0.75) * (2.0 * PI / 3.0)).sin() + 1.0
}

fn elastic_in_out(t: f64) -> f64 {
    let c = (2.0 * PI) / 4.5;
    if t < 0.5 {
        -(2.0_f64).powf(20.0 * t - 10.0) * ((t * 20.0 - 11.125) * c).sin() / 2.0
    } else {
        (2.0_f64).powf(-20.0 * t + 10.0) * ((t * 20.0 - 11.125) * c).sin() / 2.0 + 1.0
    }
}

/// Each bounce is a parabola
fn bounce_out(t: f64) -> f64 {
    let n1 = 7.5625;
    let d1 = 2.75;

    if t < 1.0 / d1 {
        n1 * t * t
    } else if t < 2.0 / d1 {
        let t = t - 1.5 / d1;
        n1 * t * t + 0.75
    } else if t < 2.5 / d1 {
        let t = t - 2.25 / d1;
        n1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / d1;
        n1 * t * t + 0.984375
    }
}

fn back_in(t: f64) -> f64 {
    let c = BACK_OVERSHOOT;
    (c + 1.0) * t * t * t - c * t * t
}

fn back_out(t: f64) -> f64 {
    let c = BACK_OVERSHOOT;
    1.0 + (c + 1.0) * (t - 1.0).powi(3) + c * (t - 1.0).powi(2)
}

fn back_in_out(t: f64) -> f64 {
    let c = BACK_OVERSHOOT * 1.525;
    if t < 0.5 {
        (2.0 * t).powi(2) * ((c + 1.0) * 2.0 * t - c) / 2.0
    } else {
        ((2.0 * t - 2.0).powi(2) * ((c + 1.0) * (t * 2.0 - 2.0) + c) + 2.0) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear() {
        let ease = Ease::Linear;
        assert_eq!(ease.progress(0.0), 0.0);
        assert_eq!(ease.progress(0.5), 0.5);
        assert_eq!(ease.progress(1.0), 1.0);
    }

    #[test]
    fn test_endpoints_are_exact() {
        for ease in Ease::NAMED.iter() {
            assert_eq!(ease.apply(10.0, 90.0, 0.0, 2.0), 10.0, "{:?} at start", ease);
            assert_eq!(ease.apply(10.0, 90.0, 2.0, 2.0), 100.0, "{:?} at end", ease);
        }
    }

    #[test]
    fn test_interior_points_leave_endpoints() {
        let begin = 10.0;
        let change = 90.0;
        let duration = 2.0;

        for ease in Ease::NAMED.iter() {
            for fraction in [0.4, 0.6, 0.95] {
                let value = ease.apply(begin, change, duration * fraction, duration);
                assert_ne!(value, begin, "{:?} at {}", ease, fraction);
                assert_ne!(value, begin + change, "{:?} at {}", ease, fraction);
            }
        }
    }

    #[test]
    fn test_clamp() {
        let ease = Ease::Linear;
        assert_eq!(ease.progress(-0.5), 0.0);
        assert_eq!(ease.progress(1.5), 1.0);
    }

    #[test]
    fn test_elastic_and_bounce_boundaries() {
        for ease in [
            Ease::ElasticIn,
            Ease::ElasticOut,
            Ease::ElasticInOut,
            Ease::BounceIn,
            Ease::BounceOut,
            Ease::BounceInOut,
        ] {
            assert_eq!(ease.progress(0.0), 0.0);
            assert_eq!(ease.progress(1.0), 1.0);
        }
    }

    #[test]
    fn test_in_out_midpoint() {
        for ease in [Ease::SmoothInOut, Ease::StrongInOut, Ease::BounceInOut] {
            assert!((ease.progress(0.5) - 0.5).abs() < 1e-9, "{:?}", ease);
        }
    }

    #[test]
    fn test_back_overshoots() {
        assert!(Ease::BackIn.progress(0.2) < 0.0);
        assert!(Ease::BackOut.progress(0.8) > 1.0);
    }

    #[test]
    fn test_zero_duration_is_elapsed() {
        assert_eq!(Ease::ElasticOut.apply(5.0, 5.0, 0.0, 0.0), 10.0);
        assert_eq!(Ease::Linear.apply(5.0, 5.0, 0.0, -1.0), 10.0);
    }

    #[test]
    fn test_reversed_table() {
        assert_eq!(Ease::SmoothIn.reversed(), Ease::SmoothOut);
        assert_eq!(Ease::BounceOut.reversed(), Ease::BounceIn);
        assert_eq!(Ease::BackIn.reversed(), Ease::BackOut);
        assert_eq!(Ease::ElasticInOut.reversed(), Ease::ElasticInOut);
        assert_eq!(Ease::Linear.reversed(), Ease::Linear);
    }

    #[test]
    fn test_reversed_twice_is_identity() {
        for ease in Ease::NAMED.iter() {
            assert_eq!(&ease.reversed().reversed(), ease);
        }
    }

    #[test]
    fn test_reversed_mirrors_in_time() {
        // f_rev(t) == 1 - f(1 - t) for the In/Out pairs
        for ease in [Ease::SmoothIn, Ease::StrongOut, Ease::BounceIn] {
            let rev = ease.reversed();
            for t in [0.1, 0.3, 0.7] {
                let expected = 1.0 - ease.progress(1.0 - t);
                assert!((rev.progress(t) - expected).abs() < 1e-9, "{:?}", ease);
            }
        }
    }

    #[test]
    fn test_custom_is_its_own_reverse() {
        let ease = Ease::custom(|t| t * t * t);
        assert_eq!(ease.reversed(), ease);
        assert_eq!(ease.progress(0.5), 0.125);
        assert_eq!(ease.name(), "custom");
    }

    #[test]
    fn test_custom_pair_swaps() {
        let ease = Ease::custom_pair(|t| t * t, |t| 1.0 - (1.0 - t) * (1.0 - t));
        let rev = ease.reversed();

        assert_ne!(rev, ease);
        assert_eq!(rev.reversed(), ease);
        assert_eq!(ease.progress(0.5), 0.25);
        assert_eq!(rev.progress(0.5), 0.75);
    }

    #[test]
    fn test_distinct_customs_are_not_equal() {
        assert_ne!(Ease::custom(|t| t), Ease::custom(|t| t));
        assert_ne!(Ease::custom(|t| t), Ease::Linear);
    }
}
