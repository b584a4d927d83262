// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Sender side of the transfer protocol.

use std::fmt;

use anyhow::{bail, Context, Result};

use sdfu_common::{digest_of, Md5Checksum, TransferMetadata};
use sdfu_common::{ACK, ACK_WINDOW, NACK, START_TRANSFER_CMD};

/// Byte pipe to a device running the bootloader.
pub trait Link {
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Wait for the next single-byte reply.
    fn read_reply(&mut self) -> Result<u8>;
}

/// Point in the transfer an ACK is expected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Header,
    /// Window ending after this many image bytes.
    Window(u32),
    PartialPage,
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Start => f.write_str("start command"),
            Stage::Header => f.write_str("transfer header"),
            Stage::Window(end) => write!(f, "image window ending at byte {end}"),
            Stage::PartialPage => f.write_str("trailing partial page"),
            Stage::Verify => f.write_str("image verification"),
        }
    }
}

/// Header the device expects for `image`.
pub fn header_for(image: &[u8]) -> Result<TransferMetadata> {
    let size = u32::try_from(image.len()).context("image does not fit a 32-bit size")?;
    if size == 0 {
        bail!("image is empty");
    }
    Ok(TransferMetadata::new(
        size,
        digest_of(&mut Md5Checksum::new(), image),
    ))
}

fn expect_ack(link: &mut impl Link, stage: Stage) -> Result<()> {
    let reply = link
        .read_reply()
        .with_context(|| format!("waiting for ACK to {stage}"))?;
    match reply {
        ACK => Ok(()),
        NACK => bail!("device rejected the transfer at {stage} (NACK)"),
        other => bail!("expected ACK or NACK after {stage}, got 0x{other:02x}"),
    }
}

/// Run one complete transfer of `image`.
///
/// `page_size` must match the device's erase page, which decides whether
/// a trailing partial-page ACK is sent. `progress` receives the number of
/// image bytes written so far.
pub fn send_image(
    link: &mut impl Link,
    image: &[u8],
    page_size: u32,
    mut progress: impl FnMut(u64),
) -> Result<TransferMetadata> {
    let header = header_for(image)?;

    link.write_all(&[START_TRANSFER_CMD])?;
    expect_ack(link, Stage::Start)?;

    link.write_all(&header.to_bytes())?;
    expect_ack(link, Stage::Header)?;

    let mut sent = 0u32;
    for window in image.chunks(ACK_WINDOW as usize) {
        link.write_all(window)?;
        sent += window.len() as u32;
        progress(u64::from(sent));
        if window.len() == ACK_WINDOW as usize {
            expect_ack(link, Stage::Window(sent))?;
        }
    }

    if header.size % page_size != 0 {
        expect_ack(link, Stage::PartialPage)?;
    }
    expect_ack(link, Stage::Verify)?;

    Ok(header)
}
