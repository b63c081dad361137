//! MAV_STATE: System state

pub const UNINIT: u64 = 0;
/// Active
pub const ACTIVE: u64 = 4;

/// (name, value) of every entry, in declaration order.
pub const ENTRIES: &[(&str, u64)] = &[
    ("UNINIT", 0),
    ("ACTIVE", 4),
];

pub fn name_of(value: u64) -> Option<&'static str> {
    ENTRIES.iter().find(|(_, v)| *v == value).map(|(n, _)| *n)
}
