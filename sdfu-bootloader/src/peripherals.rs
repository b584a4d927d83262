// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Board bring-up and the peripherals shared by all services.

use rp2040_hal::{
    self as hal,
    clocks::init_clocks_and_plls,
    gpio::{bank0, FunctionSioInput, FunctionSioOutput, Pin, PullDown, PullUp},
    pac, Sio, Timer, Watchdog,
};

use crate::uart::{self, Uart};

const XTAL_FREQ_HZ: u32 = 12_000_000;

pub type TransferLed = Pin<bank0::Gpio25, FunctionSioOutput, PullDown>;
pub type BlockLed = Pin<bank0::Gpio15, FunctionSioOutput, PullDown>;
pub type TriggerPin = Pin<bank0::Gpio2, FunctionSioInput, PullUp>;

pub struct Peripherals {
    pub timer: Timer,
    pub uart: Uart,
    /// On while a transfer is open.
    pub transfer_led: TransferLed,
    /// On while image bytes are arriving.
    pub block_led: BlockLed,
    /// Held low at power-up to stay in update mode.
    pub trigger: TriggerPin,
}

pub fn init() -> Peripherals {
    let Some(mut pac) = pac::Peripherals::take() else {
        defmt::panic!("Peripherals already taken");
    };
    let mut watchdog = Watchdog::new(pac.WATCHDOG);
    let Ok(clocks) = init_clocks_and_plls(
        XTAL_FREQ_HZ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    ) else {
        defmt::panic!("Clock init failed");
    };

    let sio = Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );
    let timer = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);

    let uart = uart::init(
        pac.UART0,
        (pins.gpio0.into_function(), pins.gpio1.into_function()),
        &mut pac.RESETS,
        &clocks,
    );

    Peripherals {
        timer,
        uart,
        transfer_led: pins.gpio25.into_push_pull_output(),
        block_led: pins.gpio15.into_push_pull_output(),
        trigger: pins.gpio2.into_pull_up_input(),
    }
}
