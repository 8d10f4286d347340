//! Composite cache keys.
//!
//! Segments are joined with `:` so that `GLOB` patterns can address every
//! entry of an origin (`nearby:poi:7:*`) or a whole kind (`isochrone:*`).

use prox_core::entities::EntityRef;
use prox_core::enums::{EntityType, ProviderId};
use prox_core::geo::Coordinates;

#[must_use]
pub fn nearby(origin: EntityRef, target: EntityType, profile: &str) -> String {
    format!(
        "nearby:{}:{}:{}:{}",
        origin.entity_type,
        origin.id,
        target,
        glob_escape(profile)
    )
}

/// Every nearby entry computed for `origin`.
#[must_use]
pub fn nearby_origin_pattern(origin: EntityRef) -> String {
    format!("nearby:{}:{}:*", origin.entity_type, origin.id)
}

/// Ranges are expected sorted; the key lists them as `300-600-900`.
#[must_use]
pub fn isochrone(origin: EntityRef, profile: &str, ranges_secs: &[u32]) -> String {
    let ranges = ranges_secs
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join("-");
    format!(
        "isochrone:{}:{}:{}:{}",
        origin.entity_type,
        origin.id,
        glob_escape(profile),
        ranges
    )
}

/// Queries are case-folded and whitespace-collapsed so trivial variants share an entry.
#[must_use]
pub fn geocode(provider: ProviderId, query: &str) -> String {
    let normalized = query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    format!("geocode:{provider}:{}", glob_escape(&normalized))
}

/// Positions are rounded to ~1 m.
#[must_use]
pub fn reverse(provider: ProviderId, at: Coordinates) -> String {
    format!("reverse:{provider}:{:.5},{:.5}", at.lat(), at.lng())
}

/// Lock key for on-demand computation of an origin's nearby sets.
#[must_use]
pub fn nearby_lock(origin: EntityRef) -> String {
    format!("lock:nearby:{}:{}", origin.entity_type, origin.id)
}

#[must_use]
pub fn isochrone_lock(origin: EntityRef, profile: &str) -> String {
    format!(
        "lock:isochrone:{}:{}:{}",
        origin.entity_type,
        origin.id,
        glob_escape(profile)
    )
}

/// Wrap `GLOB` metacharacters in brackets so user text matches literally.
#[must_use]
pub fn glob_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '*' | '?' | '[' => {
                out.push('[');
                out.push(c);
                out.push(']');
            }
            _ => out.push(c),
        }
    }
    out
}
