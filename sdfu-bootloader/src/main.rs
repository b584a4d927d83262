// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

#![no_std]
#![no_main]

mod boot;
mod flash;
mod peripherals;
mod services;
mod uart;

use defmt_rtt as _;
use panic_probe as _;

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;
use sdfu_common::service::{EventBus, Service, ServiceContext};

use peripherals::Peripherals;
use services::{BootService, LedBlinkService, TriggerCheckService, UartService, UpdateService};

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

#[entry]
fn main() -> ! {
    defmt::println!("Bootloader v{} init", env!("SDFU_VERSION"));

    let mut peripherals = peripherals::init();
    sdfu_common::blink(&mut peripherals.transfer_led, &mut peripherals.timer, 3, 100);

    let layout = boot::MemoryLayout::from_linker();
    let flash_layout = layout.flash_layout();
    defmt::println!(
        "Layout: app 0x{:08x}..0x{:08x}, metadata 0x{:08x}",
        layout.app_base,
        layout.app_end,
        layout.metadata
    );

    let events = EventBus::new();
    let trigger = TriggerCheckService::new();
    let boot = BootService::new(layout);
    let uart = UartService::new();
    let update = UpdateService::new(flash_layout);
    let led = LedBlinkService::new();

    let services: [&dyn Service<Peripherals>; 5] = [&trigger, &boot, &uart, &update, &led];

    loop {
        let mut ctx = ServiceContext {
            peripherals: &mut peripherals,
            events: &events,
        };
        for service in services {
            service.process(&mut ctx);
        }
    }
}
