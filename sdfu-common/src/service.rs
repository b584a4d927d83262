// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Cooperative services sharing one main loop.

use core::cell::RefCell;
use heapless::Vec;

/// Why the bootloader stays resident instead of starting the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateReason {
    /// The update trigger input was asserted at power-up.
    Trigger,
    /// No accepted transfer is recorded in the metadata page.
    NoMetadata,
    /// The application region does not match the recorded image.
    ImageRejected,
}

/// Events that can be sent between services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Stay in the bootloader and wait for a transfer
    RequestUpdate(UpdateReason),
    /// Hand control to the installed application
    RequestBoot,
}

const EVENT_CAPACITY: usize = 8;

/// Event bus for inter-service communication
pub struct EventBus {
    events: RefCell<Vec<Event, EVENT_CAPACITY>>,
}

impl EventBus {
    pub const fn new() -> Self {
        Self {
            events: RefCell::new(Vec::new()),
        }
    }

    /// Publish an event to the bus
    pub fn publish(&self, event: Event) {
        if self.events.borrow_mut().push(event).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Event bus full, dropping event: {:?}", event);
        }
    }

    /// Remove and return the oldest event accepted by `select`.
    pub fn take<T>(&self, mut select: impl FnMut(&Event) -> Option<T>) -> Option<T> {
        let mut events = self.events.borrow_mut();
        let (index, value) = events
            .iter()
            .enumerate()
            .find_map(|(i, e)| select(e).map(|v| (i, v)))?;
        events.remove(index);
        Some(value)
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared context passed to all services
pub struct ServiceContext<'a, P> {
    pub peripherals: &'a mut P,
    pub events: &'a EventBus,
}

/// A unit of work polled once per main-loop iteration.
pub trait Service<P> {
    /// Uses interior mutability (Cell/RefCell) for its own state.
    fn process(&self, ctx: &mut ServiceContext<P>);
}
