// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Protocol state machine behaviour against recording doubles.

mod common;

use common::{header_for, image, transfer_bytes, MockBoard, MockFlash, Op};
use sdfu_common::protocol::expected_acks;
use sdfu_common::{
    DataTerminal, FlashLayout, Md5Checksum, TransferError, TransferMetadata, TransferState, ACK,
    METADATA_MAGIC, NACK, START_TRANSFER_CMD,
};

const PAGE: usize = 0x800;
const APP_BASE: u32 = 0x0800_4000;
const METADATA_ADDR: u32 = 0x0800_3800;

type Terminal = DataTerminal<MockFlash, Md5Checksum, PAGE>;

fn terminal() -> Terminal {
    DataTerminal::new(
        FlashLayout::new(APP_BASE, METADATA_ADDR),
        MockFlash::new(PAGE as u32),
        Md5Checksum::new(),
    )
}

fn feed(t: &mut Terminal, board: &mut MockBoard, bytes: &[u8]) -> Vec<TransferError> {
    bytes
        .iter()
        .filter_map(|&b| t.process_byte(b, board).err())
        .collect()
}

/// Feed the start command and header, returning the replies to both.
fn open_transfer(t: &mut Terminal, board: &mut MockBoard, header: &TransferMetadata) -> Vec<u8> {
    let mut bytes = vec![START_TRANSFER_CMD];
    bytes.extend_from_slice(&header.to_bytes());
    assert!(feed(t, board, &bytes).is_empty());
    board.take_replies()
}

#[test]
fn test_waiting_rejects_every_other_byte() {
    let mut t = terminal();
    let mut board = MockBoard::default();

    for byte in (0..=u8::MAX).filter(|&b| b != START_TRANSFER_CMD) {
        assert_eq!(t.process_byte(byte, &mut board), Err(TransferError::Framing(byte)));
        assert_eq!(board.take_replies(), vec![NACK]);
        assert_eq!(t.state(), TransferState::Waiting);
    }
    assert_eq!(board.resets, 0);
}

#[test]
fn test_start_command_opens_header() {
    let mut t = terminal();
    let mut board = MockBoard::default();

    assert_eq!(t.process_byte(START_TRANSFER_CMD, &mut board), Ok(()));
    assert_eq!(board.replies, vec![ACK]);
    assert_eq!(t.state(), TransferState::ReceivingHeader);
    assert!(board.transfer_led);
}

#[test]
fn test_header_is_silent_until_complete() {
    let mut t = terminal();
    let mut board = MockBoard::default();
    let header = TransferMetadata::new(16, [0; 16]).to_bytes();

    feed(&mut t, &mut board, &[START_TRANSFER_CMD]);
    board.take_replies();
    feed(&mut t, &mut board, &header[..TransferMetadata::SIZE - 1]);
    assert!(board.replies.is_empty());
    assert_eq!(t.state(), TransferState::ReceivingHeader);

    feed(&mut t, &mut board, &header[TransferMetadata::SIZE - 1..]);
    assert_eq!(board.replies, vec![ACK]);
    assert_eq!(t.state(), TransferState::ReceivingBlock);
    assert_eq!(t.write_address(), APP_BASE);
    assert_eq!(t.flash().ops, vec![Op::Unlock]);
}

#[test]
fn test_bad_magic_always_nacks() {
    for (magic, size, digest) in [
        (0u32, 16u32, [0u8; 16]),
        (METADATA_MAGIC ^ 1, 2048, [0xAB; 16]),
        (0xFFFF_FFFF, u32::MAX, [0xFF; 16]),
        (METADATA_MAGIC.swap_bytes(), 1, [1; 16]),
    ] {
        let mut t = terminal();
        let mut board = MockBoard::default();
        let header = TransferMetadata {
            magic,
            size,
            digest,
        };

        let errors = {
            feed(&mut t, &mut board, &[START_TRANSFER_CMD]);
            board.take_replies();
            feed(&mut t, &mut board, &header.to_bytes())
        };

        assert_eq!(errors, vec![TransferError::Metadata(magic)]);
        assert_eq!(board.replies, vec![NACK]);
        assert_eq!(t.state(), TransferState::Waiting);
        assert!(!t.flash().unlocked);
        assert!(t.flash().erases().is_empty());
    }
}

#[test]
fn test_empty_image_header_is_rejected() {
    let mut t = terminal();
    let mut board = MockBoard::default();

    feed(&mut t, &mut board, &[START_TRANSFER_CMD]);
    let errors = feed(&mut t, &mut board, &TransferMetadata::new(0, [0; 16]).to_bytes());

    assert_eq!(errors, vec![TransferError::EmptyImage]);
    assert_eq!(board.replies, vec![ACK, NACK]);
    assert!(t.flash().erases().is_empty());
    assert_eq!(t.state(), TransferState::Waiting);
}

#[test]
fn test_two_page_transfer_end_to_end() {
    let mut t = terminal();
    let mut board = MockBoard::default();
    let data = image(2 * PAGE);
    let header = header_for(&data);

    assert!(feed(&mut t, &mut board, &transfer_bytes(&header, &data)).is_empty());

    // start, header, four windows, verified image
    assert_eq!(board.replies, vec![ACK; 7]);
    assert_eq!(
        t.flash().erases(),
        vec![APP_BASE, APP_BASE + 0x800, METADATA_ADDR]
    );
    assert_eq!(t.flash().programs(), 2 * PAGE / 4 + TransferMetadata::SIZE / 4);
    assert_eq!(t.flash().read(APP_BASE, data.len()), data);
    assert_eq!(
        t.flash().read(METADATA_ADDR, TransferMetadata::SIZE),
        header.to_bytes().to_vec()
    );
    assert_eq!(t.flash().ops.last(), Some(&Op::Lock));
    assert_eq!(board.resets, 1);
    assert_eq!(t.state(), TransferState::Waiting);
}

#[test]
fn test_ack_count_matches_formula() {
    for size in [1usize, 100, 1023, 1024, 1025, 2047, 2048, 2049, 3000, 4096, 5000] {
        let mut t = terminal();
        let mut board = MockBoard::default();
        let data = image(size);
        let header = header_for(&data);

        feed(&mut t, &mut board, &transfer_bytes(&header, &data));

        let acks_after_start = board.replies.len() as u32 - 1;
        assert!(board.replies.iter().all(|&b| b == ACK), "size {size}");
        assert_eq!(acks_after_start, expected_acks(size as u32, PAGE as u32), "size {size}");
        assert_eq!(t.flash().erases().len(), size.div_ceil(PAGE) + 1, "size {size}");
        assert_eq!(board.resets, 1, "size {size}");
    }
}

#[test]
fn test_partial_page_is_padded_with_buffer_contents() {
    let mut t = terminal();
    let mut board = MockBoard::default();
    let data = image(3000);
    let header = header_for(&data);

    feed(&mut t, &mut board, &transfer_bytes(&header, &data));

    assert_eq!(t.flash().erases(), vec![APP_BASE, APP_BASE + 0x800, METADATA_ADDR]);
    assert_eq!(t.flash().read(APP_BASE, 3000), data);
    // The buffer was cleared by the first flush.
    assert_eq!(t.flash().read(APP_BASE + 3000, 4096 - 3000), vec![0; 4096 - 3000]);
}

#[test]
fn test_trailing_page_keeps_filler_from_aborted_transfer() {
    let mut t = terminal();
    let mut board = MockBoard::default();

    open_transfer(&mut t, &mut board, &TransferMetadata::new(4096, [0; 16]));
    feed(&mut t, &mut board, &[0xAA; 100]);
    t.abort(&mut board);
    assert_eq!(board.take_replies(), vec![NACK]);

    let data = vec![0x11; 10];
    let header = header_for(&data);
    feed(&mut t, &mut board, &transfer_bytes(&header, &data));

    assert_eq!(board.replies, vec![ACK; 4]);
    let page = t.flash().read(APP_BASE, PAGE);
    assert_eq!(&page[..10], &[0x11; 10]);
    assert_eq!(&page[10..100], &[0xAA; 90]);
    assert!(page[100..].iter().all(|&b| b == 0));
}

#[test]
fn test_window_ack_timing() {
    let mut t = terminal();
    let mut board = MockBoard::default();
    let data = image(4096);

    open_transfer(&mut t, &mut board, &header_for(&data));

    feed(&mut t, &mut board, &data[..1023]);
    assert!(board.replies.is_empty());
    assert!(t.flash().erases().is_empty());

    feed(&mut t, &mut board, &data[1023..1024]);
    assert_eq!(board.take_replies(), vec![ACK]);
    assert!(t.flash().erases().is_empty());

    feed(&mut t, &mut board, &data[1024..2048]);
    assert_eq!(board.take_replies(), vec![ACK]);
    assert_eq!(t.flash().erases(), vec![APP_BASE]);
    assert_eq!(t.write_address(), APP_BASE + 0x800);
    assert_eq!(t.bytes_received(), 2048);
}

#[test]
fn test_single_bit_flip_is_rejected() {
    let data = image(2 * PAGE);
    let header = header_for(&data);

    for bit in [0usize, 7, 1000 * 8 + 3, 2047 * 8 + 7, 4095 * 8 + 7] {
        let mut t = terminal();
        let mut board = MockBoard::default();
        let mut corrupted = data.clone();
        corrupted[bit / 8] ^= 1 << (bit % 8);

        let errors = feed(&mut t, &mut board, &transfer_bytes(&header, &corrupted));

        assert_eq!(errors, vec![TransferError::Integrity]);
        assert_eq!(board.replies, vec![ACK, ACK, ACK, ACK, ACK, ACK, NACK]);
        assert_eq!(board.resets, 0);
        assert_eq!(t.state(), TransferState::Waiting);
        assert!(!t.flash().unlocked);
        assert!(!board.transfer_led && !board.block_led);
        // Programmed pages are left in place, metadata is never touched.
        assert_eq!(t.flash().erases(), vec![APP_BASE, APP_BASE + 0x800]);
    }
}

#[test]
fn test_recovers_after_failure() {
    let mut t = terminal();
    let mut board = MockBoard::default();
    let data = image(1500);
    let header = header_for(&data);

    let mut corrupted = data.clone();
    corrupted[0] ^= 0x80;
    feed(&mut t, &mut board, &transfer_bytes(&header, &corrupted));
    assert_eq!(board.take_replies().last(), Some(&NACK));

    feed(&mut t, &mut board, &transfer_bytes(&header, &data));
    assert_eq!(board.replies, vec![ACK; 5]);
    assert_eq!(board.resets, 1);
    assert_eq!(t.flash().read(APP_BASE, data.len()), data);
}

#[test]
fn test_identical_transfers_are_idempotent() {
    let mut t = terminal();
    let mut board = MockBoard::default();
    let data = image(5000);
    let header = header_for(&data);
    let region = 3 * PAGE;

    feed(&mut t, &mut board, &transfer_bytes(&header, &data));
    let first = t.flash().read(APP_BASE, region);
    let first_meta = t.flash().read(METADATA_ADDR, TransferMetadata::SIZE);

    feed(&mut t, &mut board, &transfer_bytes(&header, &data));
    assert_eq!(board.resets, 2);
    assert_eq!(t.flash().read(APP_BASE, region), first);
    assert_eq!(t.flash().read(METADATA_ADDR, TransferMetadata::SIZE), first_meta);
}

#[test]
fn test_indicators_follow_transfer() {
    let mut t = terminal();
    let mut board = MockBoard::default();
    let data = image(64);

    open_transfer(&mut t, &mut board, &header_for(&data));
    assert!(board.transfer_led);
    assert!(!board.block_led);

    feed(&mut t, &mut board, &data[..1]);
    assert!(board.block_led);

    t.abort(&mut board);
    assert!(!board.transfer_led);
    assert!(!board.block_led);
}

#[test]
fn test_write_cursor_wraps_at_top_of_address_space() {
    let top_page = 0u32.wrapping_sub(PAGE as u32);
    let mut t = terminal_with(FlashLayout::new(top_page, METADATA_ADDR));
    let mut board = MockBoard::default();
    let data = image(PAGE);
    let header = header_for(&data);

    assert!(feed(&mut t, &mut board, &transfer_bytes(&header, &data)).is_empty());

    assert_eq!(t.flash().erases(), vec![top_page, METADATA_ADDR]);
    assert_eq!(t.flash().read(top_page, PAGE), data);
    assert_eq!(t.write_address(), 0);
    assert_eq!(board.resets, 1);
}

#[test]
#[should_panic(expected = "page aligned")]
fn test_misaligned_layout_is_refused() {
    let _ = terminal_with(FlashLayout::new(APP_BASE + 4, METADATA_ADDR));
}

fn terminal_with(layout: FlashLayout) -> Terminal {
    DataTerminal::new(layout, MockFlash::new(PAGE as u32), Md5Checksum::new())
}
