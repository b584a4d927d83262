// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Hands control to the installed application once it checks out.

use crate::boot::{self, BootError, MemoryLayout};
use crate::peripherals::Peripherals;
use sdfu_common::service::{Event, Service, ServiceContext, UpdateReason};

pub struct BootService {
    layout: MemoryLayout,
}

impl BootService {
    pub fn new(layout: MemoryLayout) -> Self {
        Self { layout }
    }
}

impl Service<Peripherals> for BootService {
    fn process(&self, ctx: &mut ServiceContext<Peripherals>) {
        let requested = ctx.events.take(|event| match event {
            Event::RequestBoot => Some(()),
            _ => None,
        });
        if requested.is_none() {
            return;
        }

        defmt::println!("Checking image at 0x{:08x}", self.layout.app_base);
        match boot::validate_image(&self.layout) {
            Ok((sp, reset)) => {
                defmt::println!("  SP:    0x{:08x}", sp);
                defmt::println!("  Reset: 0x{:08x}", reset);
                defmt::println!("Jumping to application...");
                // SAFETY: vector table validated just above.
                unsafe { boot::jump_to_app(&self.layout) }
            }
            Err(e) => {
                defmt::warn!("Image not bootable: {:?}", e);
                let reason = match e {
                    BootError::NoMetadata => UpdateReason::NoMetadata,
                    _ => UpdateReason::ImageRejected,
                };
                ctx.events.publish(Event::RequestUpdate(reason));
            }
        }
    }
}
