//! Property tests for fragment reassembly.

use jabber_events::{Config, FlushReason, FragmentAssembler, MessageAssembled};
use jabber_events_testing::{Recorder, split_message};
use proptest::prelude::*;

fn split_in_any_order() -> impl Strategy<Value = (String, Vec<usize>)> {
    ("[a-zA-Z0-9 éß]{0,48}", 1_usize..12).prop_flat_map(|(body, parts)| {
        let order: Vec<usize> = (0..parts).collect();
        (Just(body), Just(order).prop_shuffle())
    })
}

proptest! {
    #[test]
    fn any_arrival_order_yields_the_original_body((body, order) in split_in_any_order()) {
        let assembler = FragmentAssembler::without_timer(&Config::default());
        let recorder = Recorder::<MessageAssembled>::attach(assembler.listeners());
        let fragments = split_message("g", "bob@example.org", &body, order.len());

        for (step, index) in order.iter().enumerate() {
            prop_assert_eq!(recorder.len(), 0, "emitted early at step {}", step);
            assembler.on_fragment(fragments[*index].clone());
        }

        let events = recorder.events();
        prop_assert_eq!(events.len(), 1);
        prop_assert_eq!(&events[0].body, &body);
        prop_assert_eq!(events[0].reason, FlushReason::Complete);
        prop_assert!(!events[0].was_truncated);
        prop_assert_eq!(assembler.pending_len(), 0);
    }

    #[test]
    fn missing_fragments_are_replaced_in_place(
        (body, order) in split_in_any_order(),
        dropped in any::<prop::sample::Index>(),
    ) {
        prop_assume!(order.len() > 1);
        let assembler = FragmentAssembler::without_timer(&Config::default());
        let recorder = Recorder::<MessageAssembled>::attach(assembler.listeners());
        let fragments = split_message("g", "bob@example.org", &body, order.len());
        let missing = dropped.index(order.len());

        for index in order.iter().filter(|i| **i != missing) {
            assembler.on_fragment(fragments[*index].clone());
        }
        prop_assert_eq!(assembler.flush_all_pending(), 1);

        let expected: String = fragments
            .iter()
            .enumerate()
            .map(|(i, f)| if i == missing { "..." } else { f.body.as_str() })
            .collect();
        let events = recorder.events();
        prop_assert_eq!(&events[0].body, &expected);
        prop_assert!(events[0].was_truncated);
        let received = u32::try_from(order.len() - 1).expect("small count");
        prop_assert_eq!(events[0].fragments_received, received);
    }
}
