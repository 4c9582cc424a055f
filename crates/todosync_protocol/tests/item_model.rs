//! Property tests for item wire conversion.

use proptest::prelude::*;
use todosync_core::{Color, Item, ItemId, Priority, Timestamp};
use todosync_protocol::{decode, encode, ElementResponse, ItemModel};

fn priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Normal),
        Just(Priority::Important),
    ]
}

fn item() -> impl Strategy<Value = Item> {
    (
        ".{0,40}",
        priority(),
        proptest::option::of(0i64..4_000_000_000),
        proptest::option::of(any::<(u8, u8, u8, u8)>()),
        any::<bool>(),
        0i64..4_000_000_000,
    )
        .prop_map(|(text, priority, deadline, color, done, created)| Item {
            id: ItemId::new(),
            text,
            priority,
            deadline: deadline.map(Timestamp),
            color: color.map(|(r, g, b, a)| Color { r, g, b, a }),
            done,
            created_at: Timestamp(created),
            changed_at: Timestamp(created + 1),
        })
}

proptest! {
    /// An item sent to the backend and echoed back is structurally equal,
    /// which is what read-repair comparisons depend on.
    #[test]
    fn echoed_item_compares_equal(item in item(), revision in 0u64..1_000_000) {
        let response = ElementResponse::ok(ItemModel::from_item(&item, "phone"), revision.into());
        let bytes = encode(&response).unwrap();
        let decoded: ElementResponse = decode(&bytes).unwrap();

        prop_assert_eq!(decoded.revision, revision);
        prop_assert_eq!(decoded.element.into_item().unwrap(), item);
    }
}
