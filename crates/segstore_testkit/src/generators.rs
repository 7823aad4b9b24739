//! Property-based test generators using proptest.

use proptest::prelude::*;
use segstore_core::GroupId;

/// Generates a group id from a small range, so groups collide often.
pub fn group_id_strategy() -> impl Strategy<Value = GroupId> {
    (0u64..4).prop_map(GroupId::new)
}

/// Generates any group id, including the extremes.
pub fn any_group_id_strategy() -> impl Strategy<Value = GroupId> {
    prop_oneof![
        Just(GroupId::new(0)),
        Just(GroupId::new(u64::MAX)),
        any::<u64>().prop_map(GroupId::new),
    ]
}

/// Generates a valid segment size in bytes.
pub fn segment_size_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(1u64),
        Just(4096u64),
        1u64..=8192,
    ]
}

/// A single store operation.
#[derive(Debug, Clone)]
pub enum Op {
    /// Create a segment in a group.
    Create {
        /// Target group.
        group: GroupId,
        /// Segment size.
        size: u64,
    },
    /// Delete a live segment, chosen by index into the live set.
    Delete {
        /// Index into the live segments, wrapped to the live count.
        pick: usize,
    },
    /// Fill a live segment with a byte.
    Write {
        /// Index into the live segments, wrapped to the live count.
        pick: usize,
        /// Fill byte.
        byte: u8,
    },
    /// Drop the store and recover it from disk.
    Reopen,
}

/// Generates a single operation, weighted towards creates.
pub fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (group_id_strategy(), segment_size_strategy())
            .prop_map(|(group, size)| Op::Create { group, size }),
        3 => any::<usize>().prop_map(|pick| Op::Delete { pick }),
        2 => (any::<usize>(), any::<u8>()).prop_map(|(pick, byte)| Op::Write { pick, byte }),
        1 => Just(Op::Reopen),
    ]
}

/// Generates a sequence of operations.
pub fn ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op_strategy(), 1..=max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn sizes_are_positive(size in segment_size_strategy()) {
            prop_assert!(size >= 1);
            prop_assert!(size <= 8192);
        }

        #[test]
        fn groups_are_small(group in group_id_strategy()) {
            prop_assert!(group.as_u64() < 4);
        }

        #[test]
        fn ops_are_bounded(ops in ops_strategy(16)) {
            prop_assert!(!ops.is_empty());
            prop_assert!(ops.len() <= 16);
        }
    }
}
