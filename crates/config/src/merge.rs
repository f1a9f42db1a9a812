//! Right-biased deep merge over JSON configuration trees.
//!
//! A key present in the overlay always wins, including `null`, `false`,
//! `0`, and `""`; only absence lets the base value survive. Arrays merge
//! positionally, never wholesale.

use serde_json::Value;
use serde_json::map::Entry;

/// Merge `overlay` onto `base` and return the combined tree.
///
/// - Two objects merge per key, recursively; base keys missing from the
///   overlay are kept, and key order is preserved.
/// - Two arrays merge positionally: overlay element `i` merges over base
///   element `i`, trailing base elements beyond the overlay's length are
///   retained, and trailing overlay elements are appended.
/// - Any other pairing replaces the base value with the overlay value.
///
/// Chaining `merge_values(merge_values(defaults, a), b)` is the canonical
/// way to fold several overlays; each step is deterministic and purely
/// structural.
#[must_use]
pub fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.entry(key) {
                    Entry::Occupied(mut slot) => {
                        // In-place update keeps the key at its original
                        // position; Map::remove would reorder the map.
                        let base_value = std::mem::take(slot.get_mut());
                        *slot.get_mut() = merge_values(base_value, overlay_value);
                    },
                    Entry::Vacant(slot) => {
                        slot.insert(overlay_value);
                    },
                }
            }
            Value::Object(base_map)
        },
        (Value::Array(mut base_items), Value::Array(overlay_items)) => {
            let mut overlay_iter = overlay_items.into_iter();
            for slot in &mut base_items {
                let Some(overlay_item) = overlay_iter.next() else {
                    break;
                };
                let base_item = std::mem::take(slot);
                *slot = merge_values(base_item, overlay_item);
            }
            base_items.extend(overlay_iter);
            Value::Array(base_items)
        },
        (_, overlay) => overlay,
    }
}
