//! Cubic bezier easing and the shared interpolator cache.

use crate::cache::LruCache;
use glam::Vec2;
use std::sync::{Arc, Mutex, OnceLock};

/// Unit cubic bezier easing curve through (0,0) and (1,1) with control
/// points `p1`, `p2`. Solved for t by Newton-Raphson on the x polynomial.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicBezier {
    p1: Vec2,
    p2: Vec2,
}

impl CubicBezier {
    pub fn new(p1: Vec2, p2: Vec2) -> Self {
        CubicBezier { p1, p2 }
    }

    pub fn ease(&self, x: f32) -> f32 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }

        let (p1, p2) = (self.p1, self.p2);
        let mut t = x;
        for _ in 0..8 {
            let one_minus_t = 1.0 - t;
            let x_est = 3.0 * one_minus_t * one_minus_t * t * p1.x
                + 3.0 * one_minus_t * t * t * p2.x
                + t * t * t;

            let err = x_est - x;
            if err.abs() < 1e-4 {
                break;
            }

            let dx_dt = 3.0 * one_minus_t * one_minus_t * p1.x
                + 6.0 * one_minus_t * t * (p2.x - p1.x)
                + 3.0 * t * t * (1.0 - p2.x);

            if dx_dt.abs() < 1e-6 {
                break;
            }
            t -= err / dx_dt;
        }

        let one_minus_t = 1.0 - t;
        3.0 * one_minus_t * one_minus_t * t * p1.y + 3.0 * one_minus_t * t * t * p2.y + t * t * t
    }
}

/// Easing applied to a keyframe's local progress.
#[derive(Debug, Clone)]
pub enum Interpolator {
    Linear,
    Bezier(Arc<CubicBezier>),
}

impl Interpolator {
    pub fn ease(&self, t: f32) -> f32 {
        match self {
            Interpolator::Linear => t.clamp(0.0, 1.0),
            Interpolator::Bezier(curve) => curve.ease(t),
        }
    }
}

const INTERPOLATOR_CACHE_CAPACITY: usize = 256;

fn interpolator_cache() -> &'static Mutex<LruCache<[u32; 4], Arc<CubicBezier>>> {
    static CACHE: OnceLock<Mutex<LruCache<[u32; 4], Arc<CubicBezier>>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(LruCache::new(INTERPOLATOR_CACHE_CAPACITY)))
}

/// Looks up or builds the interpolator for a clamped control quadruple.
/// Keyframes with identical easing share one instance. The cache is the one
/// structure touched from concurrently parsed timelines, hence the mutex;
/// eviction is a deterministic LRU bound rather than reference counting.
pub fn shared_bezier(p1: Vec2, p2: Vec2) -> Interpolator {
    let key = [
        p1.x.to_bits(),
        p1.y.to_bits(),
        p2.x.to_bits(),
        p2.y.to_bits(),
    ];
    if let Ok(mut cache) = interpolator_cache().lock() {
        if let Some(found) = cache.get(&key) {
            return Interpolator::Bezier(found.clone());
        }
        let curve = Arc::new(CubicBezier::new(p1, p2));
        cache.put(key, curve.clone());
        return Interpolator::Bezier(curve);
    }
    Interpolator::Bezier(Arc::new(CubicBezier::new(p1, p2)))
}
