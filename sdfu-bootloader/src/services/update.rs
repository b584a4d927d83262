// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Update service: runs the transfer state machine over the UART.

use crate::{flash::Rp2040Flash, peripherals::Peripherals, services::uart as rx, uart};
use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicBool, Ordering};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};
use sdfu_common::service::{Event, Service, ServiceContext, UpdateReason};
use sdfu_common::{
    Board, DataTerminal, FlashLayout, Indicator, Md5Checksum, TransferState, FLASH_PAGE_SIZE,
};

const PAGE_SIZE: usize = FLASH_PAGE_SIZE as usize;

/// Time for the final ACK to leave the UART before the reset.
const RESET_DELAY_MS: u32 = 20;

type Terminal = DataTerminal<Rp2040Flash, Md5Checksum, PAGE_SIZE>;

static ACTIVE: AtomicBool = AtomicBool::new(false);
static IDLE: AtomicBool = AtomicBool::new(false);

/// Update mode has started and the UART is being serviced.
pub fn is_active() -> bool {
    ACTIVE.load(Ordering::Relaxed)
}

/// Update mode is waiting for a transfer to start.
pub fn is_idle() -> bool {
    IDLE.load(Ordering::Relaxed)
}

/// Service-level state.
#[derive(Clone, Copy, PartialEq, Eq, defmt::Format)]
enum UpdateState {
    /// Waiting for another service to request update mode.
    Standby,
    /// Bringing up the flash driver and announcing on the UART.
    Starting,
    /// Feeding received bytes to the state machine.
    Serving,
}

#[derive(Clone, Copy)]
enum FsmEvent {
    Tick,
    UpdateRequested(UpdateReason),
}

#[derive(Clone, Copy)]
enum FsmAction {
    None,
    Start,
    PumpBytes,
}

#[derive(Clone, Copy)]
struct FsmStep {
    next_state: UpdateState,
    action: FsmAction,
}

/// [`Board`] over the bootloader's UART, status LEDs and system reset.
struct UartBoard<'a> {
    peripherals: &'a mut Peripherals,
}

impl Board for UartBoard<'_> {
    fn send(&mut self, byte: u8) {
        uart::write_byte(&self.peripherals.uart, byte);
    }

    fn indicate(&mut self, indicator: Indicator, on: bool) {
        let state = PinState::from(on);
        match indicator {
            Indicator::Transfer => self.peripherals.transfer_led.set_state(state).ok(),
            Indicator::Block => self.peripherals.block_led.set_state(state).ok(),
        };
    }

    fn reset(&mut self) {
        defmt::println!("Update complete, resetting");
        self.peripherals.timer.delay_ms(RESET_DELAY_MS);
        cortex_m::peripheral::SCB::sys_reset();
    }
}

pub struct UpdateService {
    state: Cell<UpdateState>,
    layout: FlashLayout,
    terminal: RefCell<Option<Terminal>>,
}

impl UpdateService {
    pub fn new(layout: FlashLayout) -> Self {
        Self {
            state: Cell::new(UpdateState::Standby),
            layout,
            terminal: RefCell::new(None),
        }
    }

    fn consume_update_request(ctx: &mut ServiceContext<Peripherals>) -> Option<UpdateReason> {
        ctx.events.take(|event| match event {
            Event::RequestUpdate(reason) => Some(*reason),
            _ => None,
        })
    }

    fn start(&self, ctx: &mut ServiceContext<Peripherals>) -> UpdateState {
        let terminal = DataTerminal::new(self.layout, Rp2040Flash::new(), Md5Checksum::new());
        self.terminal.replace(Some(terminal));
        uart::write_banner(&ctx.peripherals.uart);
        defmt::println!(
            "Waiting for transfer at {} baud (app 0x{:08x}, metadata 0x{:08x})",
            uart::BAUD_RATE,
            self.layout.app_base,
            self.layout.metadata_addr
        );
        ACTIVE.store(true, Ordering::Relaxed);
        IDLE.store(true, Ordering::Relaxed);
        UpdateState::Serving
    }

    fn pump_bytes(&self, ctx: &mut ServiceContext<Peripherals>) {
        let mut terminal = self.terminal.borrow_mut();
        let Some(terminal) = terminal.as_mut() else {
            defmt::error!("Update: serving without a state machine");
            return;
        };

        let mut board = UartBoard {
            peripherals: &mut *ctx.peripherals,
        };
        while let Some(byte) = rx::pop_byte() {
            if let Err(e) = terminal.process_byte(byte, &mut board) {
                defmt::warn!("Update: transfer rejected: {:?}", e);
            }
        }
        IDLE.store(terminal.state() == TransferState::Waiting, Ordering::Relaxed);
    }

    fn transition(state: UpdateState, event: FsmEvent) -> FsmStep {
        match (state, event) {
            (UpdateState::Standby, FsmEvent::UpdateRequested(_)) => FsmStep {
                next_state: UpdateState::Starting,
                action: FsmAction::None,
            },
            (UpdateState::Standby, FsmEvent::Tick) => FsmStep {
                next_state: UpdateState::Standby,
                action: FsmAction::None,
            },
            (UpdateState::Starting, _) => FsmStep {
                next_state: UpdateState::Starting,
                action: FsmAction::Start,
            },
            (UpdateState::Serving, _) => FsmStep {
                next_state: UpdateState::Serving,
                action: FsmAction::PumpBytes,
            },
        }
    }

    fn detect_event(ctx: &mut ServiceContext<Peripherals>, state: UpdateState) -> FsmEvent {
        match state {
            UpdateState::Standby => Self::consume_update_request(ctx)
                .map_or(FsmEvent::Tick, FsmEvent::UpdateRequested),
            _ => FsmEvent::Tick,
        }
    }

    fn run_action(
        &self,
        ctx: &mut ServiceContext<Peripherals>,
        state: UpdateState,
        action: FsmAction,
    ) -> UpdateState {
        match action {
            FsmAction::None => state,
            FsmAction::Start => self.start(ctx),
            FsmAction::PumpBytes => {
                self.pump_bytes(ctx);
                state
            }
        }
    }

    fn step(&self, ctx: &mut ServiceContext<Peripherals>, state: UpdateState) -> UpdateState {
        let event = Self::detect_event(ctx, state);
        let fsm_step = Self::transition(state, event);
        if let FsmEvent::UpdateRequested(reason) = event {
            defmt::println!("Update mode requested: {:?}", reason);
        }
        self.run_action(ctx, fsm_step.next_state, fsm_step.action)
    }
}

impl Service<Peripherals> for UpdateService {
    fn process(&self, ctx: &mut ServiceContext<Peripherals>) {
        let state = self.state.get();
        let new_state = self.step(ctx, state);

        if new_state != state {
            defmt::trace!("Update: State: {:?} -> {:?}", state, new_state);
        }
        self.state.set(new_state);
    }
}
