//! Facade crate: parsing entry points plus the process-wide composition
//! cache. Most users only need [`from_json_str`] and [`AnimationTree`]; the
//! full engine API lives in [`kinema_core`].

pub use kinema_core::{
    model, parse_slice, parse_str, AnimationTree, Color, Composition, CompositionCache, FrameInfo,
    KeyPath, ParseError, Property, Retention, Timeline,
};
pub use kinema_core::{value_callback, ValueCallback};

use std::sync::Arc;

/// Parses a composition from JSON text at scale 1.0.
pub fn from_json_str(json: &str) -> Result<Composition, ParseError> {
    parse_str(json, 1.0)
}

/// Parses with caching: a hit returns the shared composition, a miss parses
/// and stores the result under `cache_key`. Parse failures are returned and
/// never cached, so a corrected document can be retried under the same key.
pub fn load_cached(
    json: &str,
    cache_key: &str,
    retention: Retention,
) -> Result<Arc<Composition>, ParseError> {
    let cache = CompositionCache::global();
    if let Some(found) = cache.get(cache_key) {
        return Ok(found);
    }
    let composition = Arc::new(from_json_str(json)?);
    cache.put(cache_key, &composition, retention);
    Ok(composition)
}

/// [`load_cached`] keyed by a numeric raw-resource id.
pub fn load_raw_cached(
    json: &str,
    resource_id: u32,
    retention: Retention,
) -> Result<Arc<Composition>, ParseError> {
    load_cached(json, &CompositionCache::raw_key(resource_id), retention)
}
