//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data that maintains
//! required invariants (unique ids, wire-representable values).

use proptest::prelude::*;
use std::collections::HashSet;
use todosync_core::{Color, Item, ItemId, Priority, Timestamp};
use uuid::Uuid;

/// Strategy for generating item ids.
pub fn item_id_strategy() -> impl Strategy<Value = ItemId> {
    any::<u128>().prop_map(|n| ItemId::from_uuid(Uuid::from_u128(n)))
}

/// Strategy for generating priorities.
pub fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Normal),
        Just(Priority::Important),
    ]
}

/// Strategy for generating colors, translucent ones included.
pub fn color_strategy() -> impl Strategy<Value = Color> {
    any::<[u8; 4]>().prop_map(|[r, g, b, a]| Color { r, g, b, a })
}

/// Strategy for generating timestamps between 2000 and 2100.
pub fn timestamp_strategy() -> impl Strategy<Value = Timestamp> {
    (946_684_800i64..4_102_444_800).prop_map(Timestamp::from_secs)
}

/// Strategy for generating item text.
pub fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 ,.!?]{0,48}").expect("Invalid regex")
}

/// Strategy for generating items.
pub fn item_strategy() -> impl Strategy<Value = Item> {
    (
        item_id_strategy(),
        text_strategy(),
        priority_strategy(),
        prop::option::of(timestamp_strategy()),
        prop::option::of(color_strategy()),
        any::<bool>(),
        timestamp_strategy(),
        timestamp_strategy(),
    )
        .prop_map(
            |(id, text, priority, deadline, color, done, created_at, changed_at)| Item {
                id,
                text,
                priority,
                deadline,
                color,
                done,
                created_at,
                changed_at,
            },
        )
}

/// Strategy for generating item lists with unique ids.
pub fn items_strategy(max_len: usize) -> impl Strategy<Value = Vec<Item>> {
    prop::collection::vec(item_strategy(), 0..=max_len).prop_map(|items| {
        let mut seen = HashSet::new();
        items
            .into_iter()
            .filter(|item| seen.insert(item.id))
            .collect()
    })
}

/// Strategy for a cached list and a remote list that share some ids.
///
/// The remote list holds edited copies of a subset of the cached items
/// followed by items the cache has never seen. Every edited copy differs
/// from its cached original.
pub fn overlapping_items_strategy(
    max_len: usize,
) -> impl Strategy<Value = (Vec<Item>, Vec<Item>)> {
    items_strategy(max_len * 2)
        .prop_flat_map(|mut cached| {
            let fresh = cached.split_off(cached.len() / 2);
            let len = cached.len();
            (
                Just(cached.clone()),
                prop::sample::subsequence(cached, 0..=len),
                Just(fresh),
            )
        })
        .prop_map(|(cached, shared, fresh)| {
            let remote = shared.into_iter().map(remote_edit).chain(fresh).collect();
            (cached, remote)
        })
}

/// Returns the item as another device would have changed it.
pub fn remote_edit(item: Item) -> Item {
    Item {
        text: format!("{} (edited)", item.text),
        done: !item.done,
        changed_at: Timestamp::from_secs(item.changed_at.as_secs() + 60),
        ..item
    }
}
