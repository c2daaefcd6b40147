//! ID prefix constants.
//!
//! Session ids are generated by the store as `{prefix}-{24 hex chars}`.

/// Prefix for session record ids.
pub const PREFIX_SESSION: &str = "ses";

/// Number of random bytes behind every generated id.
pub const ID_RANDOM_BYTES: usize = 12;

/// Every prefix the store generates ids for.
pub const ALL_PREFIXES: &[&str] = &[PREFIX_SESSION];

/// Check that `id` has the shape the store generates for `prefix`.
#[must_use]
pub fn is_well_formed(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|hex| {
            hex.len() == ID_RANDOM_BYTES * 2
                && hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        })
}
