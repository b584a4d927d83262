// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! UART0 byte transport on GP0 (TX) / GP1 (RX).

use rp2040_hal::{
    clocks::ClocksManager,
    fugit::RateExtU32,
    gpio::{bank0, FunctionUart, Pin, PullDown},
    pac,
    uart::{DataBits, Enabled, StopBits, UartConfig, UartPeripheral},
    Clock,
};

pub const BAUD_RATE: u32 = 38_400;

/// Printed once when update mode starts.
pub const BANNER: &[u8] = b"[DFU]Waiting for transfer\r\n";

pub type UartPins = (
    Pin<bank0::Gpio0, FunctionUart, PullDown>,
    Pin<bank0::Gpio1, FunctionUart, PullDown>,
);

pub type Uart = UartPeripheral<Enabled, pac::UART0, UartPins>;

/// Configure UART0 for 8N1 at [`BAUD_RATE`].
pub fn init(
    device: pac::UART0,
    pins: UartPins,
    resets: &mut pac::RESETS,
    clocks: &ClocksManager,
) -> Uart {
    let config = UartConfig::new(BAUD_RATE.Hz(), DataBits::Eight, None, StopBits::One);
    match UartPeripheral::new(device, pins, resets).enable(config, clocks.peripheral_clock.freq()) {
        Ok(uart) => uart,
        Err(_) => defmt::panic!("UART0 rejected {} baud", BAUD_RATE),
    }
}

/// Next received byte, if one is waiting in the RX FIFO.
pub fn read_byte(uart: &Uart) -> Option<u8> {
    if !uart.uart_is_readable() {
        return None;
    }
    let mut byte = [0u8; 1];
    match uart.read_raw(&mut byte) {
        Ok(1) => Some(byte[0]),
        _ => None,
    }
}

pub fn write_byte(uart: &Uart, byte: u8) {
    uart.write_full_blocking(&[byte]);
}

pub fn write_banner(uart: &Uart) {
    uart.write_full_blocking(BANNER);
}

