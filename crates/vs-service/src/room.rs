//! Room naming.
//!
//! Room names are derived from the user id so that a user always lands in
//! the same room. The result always matches `^[A-Za-z0-9_-]{1,64}$` as long
//! as the prefix does (enforced when configuration loads).

/// Maximum length of a room name, in characters.
pub const MAX_ROOM_NAME_LEN: usize = 64;

fn is_room_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Derive the room name for `uid`.
///
/// Every character outside `[A-Za-z0-9_-]` becomes `_`, then the sanitized
/// uid is cut so that `prefix + sanitized` is at most 64 characters. Two
/// long uids that differ only past the cut map to the same room.
pub fn derive_room_name(uid: &str, prefix: &str) -> String {
    let budget = MAX_ROOM_NAME_LEN.saturating_sub(prefix.chars().count());

    let sanitized = uid
        .chars()
        .map(|c| if is_room_char(c) { c } else { '_' })
        .take(budget);

    let mut room = String::with_capacity(MAX_ROOM_NAME_LEN);
    room.push_str(prefix);
    room.extend(sanitized);
    room
}

/// Whether `name` matches `^[A-Za-z0-9_-]{1,64}$`.
pub fn is_valid_room_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_ROOM_NAME_LEN && name.chars().all(is_room_char)
}
