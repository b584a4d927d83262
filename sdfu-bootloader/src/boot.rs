// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

use sdfu_common::{digest_of, FlashLayout, Md5Checksum, TransferMetadata};

const RAM_START: u32 = 0x2000_0000;
const RAM_END: u32 = 0x2004_2000;

unsafe extern "C" {
    static __app_base_addr: u32;
    static __app_end_addr: u32;
    static __dfu_metadata_addr: u32;
}

macro_rules! linker_addr {
    ($sym:ident) => {
        unsafe { &$sym as *const u32 as u32 }
    };
}

pub struct MemoryLayout {
    pub app_base: u32,
    pub app_end: u32,
    pub metadata: u32,
}

impl MemoryLayout {
    pub fn from_linker() -> Self {
        Self {
            app_base: linker_addr!(__app_base_addr),
            app_end: linker_addr!(__app_end_addr),
            metadata: linker_addr!(__dfu_metadata_addr),
        }
    }

    /// Where the update protocol writes images and their metadata.
    pub fn flash_layout(&self) -> FlashLayout {
        FlashLayout::new(self.app_base, self.metadata)
    }

    fn app_capacity(&self) -> u32 {
        self.app_end - self.app_base
    }
}

/// Why the installed image cannot be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum BootError {
    /// The metadata page holds no accepted transfer.
    NoMetadata,
    /// The recorded size does not fit the application region.
    SizeOutOfRange(u32),
    /// The application region no longer matches the recorded digest.
    DigestMismatch,
    /// The vector table does not point into RAM and the application.
    BadVectorTable { initial_sp: u32, reset_vector: u32 },
}

struct VectorTable {
    initial_sp: u32,
    reset_vector: u32,
}

impl VectorTable {
    unsafe fn read_from(addr: u32) -> Self {
        Self {
            initial_sp: (addr as *const u32).read_volatile(),
            reset_vector: (addr as *const u32).offset(1).read_volatile(),
        }
    }

    fn is_valid_for(&self, layout: &MemoryLayout) -> bool {
        // Thumb bit set, target inside the image region.
        let entry = self.reset_vector & !1;
        (RAM_START..=RAM_END).contains(&self.initial_sp)
            && self.reset_vector & 1 == 1
            && (layout.app_base..layout.app_end).contains(&entry)
    }
}

/// Update mode is requested when the trigger input is held low.
pub fn check_update_trigger(trigger_low: bool) -> bool {
    trigger_low
}

pub fn read_metadata(layout: &MemoryLayout) -> Option<TransferMetadata> {
    // SAFETY: the metadata page is memory-mapped flash.
    let metadata = unsafe { TransferMetadata::read_from(layout.metadata) };
    metadata.is_valid().then_some(metadata)
}

/// Check the installed image against its metadata.
/// Returns the entry point `(initial_sp, reset_vector)` on success.
pub fn validate_image(layout: &MemoryLayout) -> Result<(u32, u32), BootError> {
    let metadata = read_metadata(layout).ok_or(BootError::NoMetadata)?;
    if metadata.size == 0 || metadata.size > layout.app_capacity() {
        return Err(BootError::SizeOutOfRange(metadata.size));
    }

    // SAFETY: the range lies inside the memory-mapped application region.
    let image = unsafe {
        core::slice::from_raw_parts(layout.app_base as *const u8, metadata.size as usize)
    };
    if digest_of(&mut Md5Checksum::new(), image) != metadata.digest {
        return Err(BootError::DigestMismatch);
    }

    let vt = unsafe { VectorTable::read_from(layout.app_base) };
    if !vt.is_valid_for(layout) {
        return Err(BootError::BadVectorTable {
            initial_sp: vt.initial_sp,
            reset_vector: vt.reset_vector,
        });
    }
    Ok((vt.initial_sp, vt.reset_vector))
}

/// # Safety
/// `layout.app_base` must hold a vector table accepted by [`validate_image`].
pub unsafe fn jump_to_app(layout: &MemoryLayout) -> ! {
    relocate_vector_table(layout.app_base);

    let vt = VectorTable::read_from(layout.app_base);
    jump_to_firmware(vt.initial_sp, vt.reset_vector);
}

unsafe fn relocate_vector_table(base: u32) {
    cortex_m::interrupt::disable();

    const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;
    SCB_VTOR.write_volatile(base);

    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

unsafe fn jump_to_firmware(initial_sp: u32, reset_vector: u32) -> ! {
    core::arch::asm!(
        "msr msp, {sp}",
        "bx {reset}",
        sp = in(reg) initial_sp,
        reset = in(reg) reset_vector,
        options(noreturn)
    );
}
