// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

use sdfu_common::protocol::expected_acks;
use sdfu_common::service::{Event, EventBus, UpdateReason};
use sdfu_common::{ACK, NACK, START_TRANSFER_CMD};

#[test]
fn test_wire_bytes_are_distinct() {
    assert_ne!(ACK, NACK);
    assert_ne!(START_TRANSFER_CMD, ACK);
    assert_ne!(START_TRANSFER_CMD, NACK);
}

#[test]
fn test_expected_acks() {
    // header + windows + partial page + final
    assert_eq!(expected_acks(2048, 0x800), 4);
    assert_eq!(expected_acks(3000, 0x800), 5);
    assert_eq!(expected_acks(1, 4096), 3);
    assert_eq!(expected_acks(4096, 4096), 6);
    assert_eq!(expected_acks(5000, 4096), 7);
}

#[test]
fn test_event_bus_take_in_order() {
    let bus = EventBus::new();
    bus.publish(Event::RequestBoot);
    bus.publish(Event::RequestUpdate(UpdateReason::Trigger));
    bus.publish(Event::RequestUpdate(UpdateReason::NoMetadata));

    let reason = bus.take(|e| match e {
        Event::RequestUpdate(reason) => Some(*reason),
        _ => None,
    });
    assert_eq!(reason, Some(UpdateReason::Trigger));

    assert_eq!(
        bus.take(|e| matches!(e, Event::RequestBoot).then_some(())),
        Some(())
    );
    assert_eq!(
        bus.take(|e| matches!(e, Event::RequestBoot).then_some(())),
        None
    );
    assert!(!bus.is_empty());
}

#[test]
fn test_event_bus_drops_when_full() {
    let bus = EventBus::new();
    for _ in 0..20 {
        bus.publish(Event::RequestBoot);
    }

    let mut taken = 0;
    while bus.take(|e| matches!(e, Event::RequestBoot).then_some(())).is_some() {
        taken += 1;
    }
    assert_eq!(taken, 8);
    assert!(bus.is_empty());
}
