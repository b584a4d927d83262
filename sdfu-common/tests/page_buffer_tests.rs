// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

use sdfu_common::PageBuffer;

#[test]
fn test_page_buffer_starts_zeroed() {
    let page = PageBuffer::<256>::new();

    assert!(page.as_bytes().iter().all(|&b| b == 0));
    assert_eq!(page.words().count(), 64);
}

#[test]
fn test_page_buffer_words_little_endian() {
    let mut page = PageBuffer::<8>::new();
    for (i, b) in [0x78, 0x56, 0x34, 0x12, 0xEF, 0xBE, 0xAD, 0xDE].iter().enumerate() {
        page.set(i, *b);
    }

    let words: Vec<u32> = page.words().collect();
    assert_eq!(words, vec![0x1234_5678, 0xDEAD_BEEF]);
}

#[test]
fn test_page_buffer_clear_zeroes() {
    let mut page = PageBuffer::<16>::new();
    page.set(3, 0xFF);
    page.set(15, 0x01);

    page.clear();

    assert_eq!(page.as_bytes(), &[0u8; 16]);
}

#[test]
fn test_page_buffer_keeps_unwritten_tail() {
    let mut page = PageBuffer::<8>::new();
    for i in 0..8 {
        page.set(i, 0xAA);
    }
    page.set(0, 0x11);

    assert_eq!(page.as_bytes(), &[0x11, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA]);
}
