// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! UART polling service feeding received bytes to the update service.

use crate::{peripherals::Peripherals, services::update, uart};
use core::cell::UnsafeCell;
use heapless::spsc::Queue;
use sdfu_common::service::{Service, ServiceContext};

const RX_QUEUE_SIZE: usize = 512;

/// Wrapper to hold a Queue in a static without `static mut`.
///
/// SAFETY: This is only safe in a single-threaded (bare-metal, no OS) environment.
/// Only UartService (producer) calls enqueue, only UpdateService (consumer) calls dequeue.
struct SyncQueue(UnsafeCell<Queue<u8, RX_QUEUE_SIZE>>);
unsafe impl Sync for SyncQueue {}

static RX_QUEUE: SyncQueue = SyncQueue(UnsafeCell::new(Queue::new()));

fn push_byte(byte: u8) -> Result<(), u8> {
    // SAFETY: Single-threaded bare-metal environment, no concurrent access
    unsafe { (*RX_QUEUE.0.get()).enqueue(byte) }
}

/// Pop the oldest received byte (called by the update service)
pub fn pop_byte() -> Option<u8> {
    // SAFETY: Single-threaded bare-metal environment, no concurrent access
    unsafe { (*RX_QUEUE.0.get()).dequeue() }
}

/// Moves bytes from the UART RX FIFO into the receive queue
pub struct UartService;

impl UartService {
    pub fn new() -> Self {
        Self
    }
}

impl Service<Peripherals> for UartService {
    fn process(&self, ctx: &mut ServiceContext<Peripherals>) {
        if !update::is_active() {
            return;
        }

        while let Some(byte) = uart::read_byte(&ctx.peripherals.uart) {
            if push_byte(byte).is_err() {
                defmt::warn!("UART: receive queue full, dropping byte");
            }
        }
    }
}
