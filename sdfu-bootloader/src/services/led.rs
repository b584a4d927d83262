// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Heartbeat on the transfer LED while update mode waits for a sender.

use crate::{peripherals::Peripherals, services::update};
use core::cell::Cell;
use embedded_hal::digital::OutputPin;
use sdfu_common::service::{Service, ServiceContext};

#[derive(Clone, Copy)]
enum LedState {
    On { since_us: u64 },
    Off { since_us: u64 },
}

pub struct LedBlinkService {
    state: Cell<LedState>,
}

const LED_ON_US: u64 = 100_000;
const LED_OFF_US: u64 = 900_000;

impl LedBlinkService {
    pub fn new() -> Self {
        Self {
            state: Cell::new(LedState::Off { since_us: 0 }),
        }
    }
}

impl Service<Peripherals> for LedBlinkService {
    fn process(&self, ctx: &mut ServiceContext<Peripherals>) {
        // The state machine owns the LED during a transfer.
        if !update::is_idle() {
            return;
        }

        let now = ctx.peripherals.timer.get_counter().ticks();
        match self.state.get() {
            LedState::On { since_us } if now - since_us >= LED_ON_US => {
                ctx.peripherals.transfer_led.set_low().ok();
                self.state.set(LedState::Off { since_us: now });
            }
            LedState::Off { since_us } if now - since_us >= LED_OFF_US => {
                ctx.peripherals.transfer_led.set_high().ok();
                self.state.set(LedState::On { since_us: now });
            }
            _ => {}
        }
    }
}
