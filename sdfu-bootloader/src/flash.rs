// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! RP2040 flash driver built on the boot ROM routines.
//!
//! Erasing or programming the QSPI flash requires leaving XIP mode:
//!   1. connect_internal_flash()
//!   2. flash_exit_xip()
//!   3. flash_range_erase() or flash_range_program()
//!   4. flash_flush_cache()
//!   5. flash_enter_cmd_xip()
//!
//! Everything running during steps 1-5 must execute from RAM, so the two
//! wrappers live in `.data` and only call pre-resolved ROM pointers.

use core::sync::atomic::{AtomicUsize, Ordering};

use sdfu_common::{MemoryDriver, FLASH_BASE, FLASH_PAGE_SIZE, FLASH_PROGRAM_SIZE};

/// Pointer to the ROM function table (16-bit pointer stored at 0x14)
const ROM_FUNC_TABLE_PTR: *const u16 = 0x0000_0014 as *const u16;
/// Pointer to the ROM table lookup function (16-bit pointer stored at 0x18)
const ROM_TABLE_LOOKUP_PTR: *const u16 = 0x0000_0018 as *const u16;

/// 4 KB sector erase command.
const SECTOR_ERASE_CMD: u8 = 0x20;

type RomFnVoid = unsafe extern "C" fn();
type RomFnErase = unsafe extern "C" fn(u32, usize, u32, u8);
type RomFnProgram = unsafe extern "C" fn(u32, *const u8, usize);

static ROM_CONNECT_INTERNAL_FLASH: AtomicUsize = AtomicUsize::new(0);
static ROM_FLASH_EXIT_XIP: AtomicUsize = AtomicUsize::new(0);
static ROM_FLASH_RANGE_ERASE: AtomicUsize = AtomicUsize::new(0);
static ROM_FLASH_RANGE_PROGRAM: AtomicUsize = AtomicUsize::new(0);
static ROM_FLASH_FLUSH_CACHE: AtomicUsize = AtomicUsize::new(0);
static ROM_FLASH_ENTER_CMD_XIP: AtomicUsize = AtomicUsize::new(0);

/// Look up a ROM function by its two-character tag (RP2040 datasheet 2.8.3).
unsafe fn rom_func_lookup(tag: &[u8; 2]) -> usize {
    let fn_table = *ROM_FUNC_TABLE_PTR as *const u16;
    let lookup: unsafe extern "C" fn(*const u16, u32) -> usize =
        core::mem::transmute::<usize, unsafe extern "C" fn(*const u16, u32) -> usize>(
            *ROM_TABLE_LOOKUP_PTR as usize,
        );

    let code = u16::from_le_bytes(*tag) as u32;
    lookup(fn_table, code)
}

/// Resolve the ROM flash routines. Requires XIP to be active.
fn init_rom_functions() {
    unsafe {
        ROM_CONNECT_INTERNAL_FLASH.store(rom_func_lookup(b"IF"), Ordering::Release);
        ROM_FLASH_EXIT_XIP.store(rom_func_lookup(b"EX"), Ordering::Release);
        ROM_FLASH_RANGE_ERASE.store(rom_func_lookup(b"RE"), Ordering::Release);
        ROM_FLASH_RANGE_PROGRAM.store(rom_func_lookup(b"RP"), Ordering::Release);
        ROM_FLASH_FLUSH_CACHE.store(rom_func_lookup(b"FC"), Ordering::Release);
        ROM_FLASH_ENTER_CMD_XIP.store(rom_func_lookup(b"CX"), Ordering::Release);
    }
}

/// Convert an absolute XIP flash address to a flash-relative offset.
fn addr_to_offset(abs_addr: u32) -> u32 {
    abs_addr - FLASH_BASE
}

/// Erase `size` bytes at a flash-relative offset.
///
/// # Safety
/// ROM functions must have been resolved.
#[link_section = ".data"]
#[inline(never)]
unsafe fn flash_erase(offset: u32, size: u32) {
    let connect: RomFnVoid = core::mem::transmute(ROM_CONNECT_INTERNAL_FLASH.load(Ordering::Acquire));
    let exit_xip: RomFnVoid = core::mem::transmute(ROM_FLASH_EXIT_XIP.load(Ordering::Acquire));
    let erase: RomFnErase = core::mem::transmute(ROM_FLASH_RANGE_ERASE.load(Ordering::Acquire));
    let flush: RomFnVoid = core::mem::transmute(ROM_FLASH_FLUSH_CACHE.load(Ordering::Acquire));
    let enter_xip: RomFnVoid = core::mem::transmute(ROM_FLASH_ENTER_CMD_XIP.load(Ordering::Acquire));

    cortex_m::interrupt::disable();
    connect();
    exit_xip();
    erase(offset, size as usize, FLASH_PAGE_SIZE, SECTOR_ERASE_CMD);
    flush();
    enter_xip();
    cortex_m::interrupt::enable();
}

/// Program `len` bytes from `data` at a flash-relative offset.
///
/// # Safety
/// ROM functions must have been resolved and `data` must not point into flash.
#[link_section = ".data"]
#[inline(never)]
unsafe fn flash_program(offset: u32, data: *const u8, len: usize) {
    let connect: RomFnVoid = core::mem::transmute(ROM_CONNECT_INTERNAL_FLASH.load(Ordering::Acquire));
    let exit_xip: RomFnVoid = core::mem::transmute(ROM_FLASH_EXIT_XIP.load(Ordering::Acquire));
    let program: RomFnProgram = core::mem::transmute(ROM_FLASH_RANGE_PROGRAM.load(Ordering::Acquire));
    let flush: RomFnVoid = core::mem::transmute(ROM_FLASH_FLUSH_CACHE.load(Ordering::Acquire));
    let enter_xip: RomFnVoid = core::mem::transmute(ROM_FLASH_ENTER_CMD_XIP.load(Ordering::Acquire));

    cortex_m::interrupt::disable();
    connect();
    exit_xip();
    program(offset, data, len);
    flush();
    enter_xip();
    cortex_m::interrupt::enable();
}

const PROGRAM_SIZE: usize = FLASH_PROGRAM_SIZE as usize;

/// [`MemoryDriver`] for the on-board QSPI flash.
///
/// The ROM programs whole 256-byte pages, so words are staged in RAM and
/// written out when the last word of a program page arrives, when a word
/// for a different program page arrives, or on [`lock`](MemoryDriver::lock).
/// Unwritten bytes of a staged page stay 0xFF.
pub struct Rp2040Flash {
    unlocked: bool,
    staged: Option<u32>,
    buffer: [u8; PROGRAM_SIZE],
}

impl Rp2040Flash {
    pub fn new() -> Self {
        init_rom_functions();
        Self {
            unlocked: false,
            staged: None,
            buffer: [0xFF; PROGRAM_SIZE],
        }
    }

    fn commit(&mut self) {
        if let Some(page) = self.staged.take() {
            // SAFETY: ROM functions resolved in `new`, buffer is in RAM.
            unsafe { flash_program(addr_to_offset(page), self.buffer.as_ptr(), PROGRAM_SIZE) };
        }
    }
}

impl MemoryDriver for Rp2040Flash {
    fn unlock(&mut self) {
        self.unlocked = true;
    }

    fn lock(&mut self) {
        self.commit();
        self.unlocked = false;
    }

    fn erase_page(&mut self, address: u32) {
        debug_assert!(self.unlocked, "erase while locked");
        self.commit();
        defmt::trace!("Erasing sector at 0x{:08x}", address);
        // SAFETY: ROM functions resolved in `new`.
        unsafe { flash_erase(addr_to_offset(address), FLASH_PAGE_SIZE) };
    }

    fn program_word(&mut self, address: u32, word: u32) {
        debug_assert!(self.unlocked, "program while locked");
        let page = address & !(FLASH_PROGRAM_SIZE - 1);
        if self.staged.is_some_and(|staged| staged != page) {
            self.commit();
        }
        if self.staged.is_none() {
            self.buffer.fill(0xFF);
            self.staged = Some(page);
        }

        let offset = (address - page) as usize;
        self.buffer[offset..offset + 4].copy_from_slice(&word.to_le_bytes());
        if offset + 4 == PROGRAM_SIZE {
            self.commit();
        }
    }
}
