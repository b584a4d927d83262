// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Non-volatile memory driver contract.

/// Blocking page-erase / word-program flash driver.
///
/// Every call returns once the hardware has completed the operation; no
/// failure is reported. Programming is only allowed between [`unlock`] and
/// [`lock`], into a page erased since the last programming of that range.
///
/// [`unlock`]: Self::unlock
/// [`lock`]: Self::lock
pub trait MemoryDriver {
    fn unlock(&mut self);

    /// Re-protect the memory. Calling this while already locked is a no-op.
    fn lock(&mut self);

    /// Erase the page starting at the page-aligned `address`.
    fn erase_page(&mut self, address: u32);

    /// Program one word at the 4-byte aligned `address`, little-endian.
    fn program_word(&mut self, address: u32, word: u32);
}

impl<M: MemoryDriver + ?Sized> MemoryDriver for &mut M {
    fn unlock(&mut self) {
        (**self).unlock()
    }

    fn lock(&mut self) {
        (**self).lock()
    }

    fn erase_page(&mut self, address: u32) {
        (**self).erase_page(address)
    }

    fn program_word(&mut self, address: u32, word: u32) {
        (**self).program_word(address, word)
    }
}

#[cfg(feature = "std")]
pub mod sim {
    //! In-memory flash for dry runs and tests.

    use super::MemoryDriver;
    use std::collections::BTreeMap;
    use std::vec::Vec;

    const ERASED: u8 = 0xFF;

    /// One driver call, in the order it was made.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum FlashOp {
        Unlock,
        Lock,
        Erase(u32),
        Program(u32, u32),
    }

    /// Sparse flash made of pages that exist once erased.
    ///
    /// Violations of the driver contract panic, so a test exercising the
    /// state machine fails at the offending call.
    pub struct SimFlash {
        page_size: u32,
        pages: BTreeMap<u32, Vec<u8>>,
        unlocked: bool,
        log: Vec<FlashOp>,
    }

    impl SimFlash {
        pub fn new(page_size: u32) -> Self {
            assert!(page_size % 4 == 0 && page_size > 0);
            Self {
                page_size,
                pages: BTreeMap::new(),
                unlocked: false,
                log: Vec::new(),
            }
        }

        pub fn is_unlocked(&self) -> bool {
            self.unlocked
        }

        pub fn log(&self) -> &[FlashOp] {
            &self.log
        }

        /// Addresses of erased pages, in call order.
        pub fn erased_pages(&self) -> Vec<u32> {
            self.log
                .iter()
                .filter_map(|op| match op {
                    FlashOp::Erase(addr) => Some(*addr),
                    _ => None,
                })
                .collect()
        }

        /// Read `len` bytes starting at `address`. Bytes in pages that were
        /// never erased read as `None`.
        pub fn read(&self, address: u32, len: usize) -> Option<Vec<u8>> {
            (0..len as u32)
                .map(|i| {
                    let addr = address + i;
                    let base = addr - addr % self.page_size;
                    self.pages
                        .get(&base)
                        .map(|page| page[(addr - base) as usize])
                })
                .collect()
        }

        fn page_mut(&mut self, address: u32) -> &mut Vec<u8> {
            let base = address - address % self.page_size;
            self.pages
                .get_mut(&base)
                .unwrap_or_else(|| panic!("program into unerased page at 0x{base:08x}"))
        }
    }

    impl MemoryDriver for SimFlash {
        fn unlock(&mut self) {
            self.unlocked = true;
            self.log.push(FlashOp::Unlock);
        }

        fn lock(&mut self) {
            self.unlocked = false;
            self.log.push(FlashOp::Lock);
        }

        fn erase_page(&mut self, address: u32) {
            assert!(self.unlocked, "erase at 0x{address:08x} while locked");
            assert_eq!(address % self.page_size, 0, "unaligned erase at 0x{address:08x}");
            self.pages
                .insert(address, vec![ERASED; self.page_size as usize]);
            self.log.push(FlashOp::Erase(address));
        }

        fn program_word(&mut self, address: u32, word: u32) {
            assert!(self.unlocked, "program at 0x{address:08x} while locked");
            assert_eq!(address % 4, 0, "unaligned program at 0x{address:08x}");
            let page_size = self.page_size;
            let page = self.page_mut(address);
            let offset = (address % page_size) as usize;
            let target = &mut page[offset..offset + 4];
            assert!(
                target.iter().all(|&b| b == ERASED),
                "program over unerased word at 0x{address:08x}"
            );
            target.copy_from_slice(&word.to_le_bytes());
            self.log.push(FlashOp::Program(address, word));
        }
    }
}
