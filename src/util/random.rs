//! Non-cryptographic choice for canned replies.

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::time::SystemTime;

/// Pick one element, or `None` for an empty slice.
///
/// Each `RandomState` carries fresh keys, so hashing the current time with it
/// gives a different index from call to call.
pub fn choose<T>(items: &[T]) -> Option<&T> {
    if items.is_empty() {
        return None;
    }
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    let index = RandomState::new().hash_one(now) % items.len() as u64;
    items.get(index as usize)
}
