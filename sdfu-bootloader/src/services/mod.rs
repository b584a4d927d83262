// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Service implementations for the bootloader.

pub mod boot;
pub mod led;
pub mod trigger;
pub mod uart;
pub mod update;

pub use boot::BootService;
pub use led::LedBlinkService;
pub use trigger::TriggerCheckService;
pub use uart::UartService;
pub use update::UpdateService;
