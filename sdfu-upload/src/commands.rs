// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use sdfu_common::protocol::expected_acks;
use sdfu_common::{FlashLayout, TransferMetadata};

use crate::sender;
use crate::sim::SimLink;
use crate::transport::SerialLink;

fn read_image(file: &Path) -> Result<Vec<u8>> {
    fs::read(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn print_header(header: &TransferMetadata, page_size: u32) {
    println!("  Magic:   0x{:08x}", header.magic);
    println!("  Size:    {} bytes", header.size);
    println!("  MD5:     {}", hex(&header.digest));
    println!(
        "  ACKs:    {} after the start command",
        expected_acks(header.size, page_size)
    );
}

/// Send `file` to the device behind `link`.
pub fn upload(link: &mut SerialLink, file: &Path, page_size: u32) -> Result<()> {
    let image = read_image(file)?;
    let header = sender::header_for(&image)?;

    println!("Firmware: {} ({} bytes)", file.display(), header.size);
    println!("MD5:      {}", hex(&header.digest));
    println!();

    let cruft = link.drain()?;
    if cruft > 0 {
        println!("Discarded {cruft} buffered bytes from {}", link.port_name());
    }

    let pb = ProgressBar::new(u64::from(header.size));
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    if let Err(e) = sender::send_image(link, &image, page_size, |sent| pb.set_position(sent)) {
        pb.abandon();
        return Err(e);
    }

    pb.finish_with_message("Upload complete");
    println!();
    println!("Image verified, device is resetting into the new firmware.");
    Ok(())
}

/// Print the header for `file`, and optionally write its 24 raw bytes.
pub fn header(file: &Path, output: Option<&Path>, page_size: u32) -> Result<()> {
    let image = read_image(file)?;
    let header = sender::header_for(&image)?;

    println!("Header for {}:", file.display());
    print_header(&header, page_size);

    if let Some(output) = output {
        fs::write(output, header.to_bytes())
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("Wrote {} bytes to {}", TransferMetadata::SIZE, output.display());
    }
    Ok(())
}

/// Run the whole transfer against the in-process device.
pub fn simulate(file: &Path, layout: FlashLayout, page_size: u32, verbose: bool) -> Result<()> {
    match page_size {
        1024 => simulate_with::<1024>(file, layout, verbose),
        2048 => simulate_with::<2048>(file, layout, verbose),
        4096 => simulate_with::<4096>(file, layout, verbose),
        other => bail!("unsupported page size {other} (expected 1024, 2048 or 4096)"),
    }
}

fn simulate_with<const PAGE: usize>(file: &Path, layout: FlashLayout, verbose: bool) -> Result<()> {
    if !layout.is_page_aligned(PAGE as u32) {
        bail!(
            "layout app_base=0x{:08x} metadata=0x{:08x} is not aligned to {PAGE}-byte pages",
            layout.app_base,
            layout.metadata_addr
        );
    }

    let image = read_image(file)?;
    let mut link = SimLink::<PAGE>::new(layout);

    let header = sender::send_image(&mut link, &image, PAGE as u32, |_| {})
        .context("Simulated transfer failed")?;

    println!("Simulated transfer of {} ({PAGE}-byte pages):", file.display());
    print_header(&header, PAGE as u32);
    println!("  Pages:   {:08x?}", link.flash().erased_pages());
    println!("  Resets:  {}", link.resets());
    println!("  State:   {:?}", link.state());

    let stored = link
        .flash()
        .read(layout.metadata_addr, TransferMetadata::SIZE)
        .context("metadata page was never written")?;
    let stored = TransferMetadata::from_bytes(
        stored
            .as_slice()
            .try_into()
            .context("metadata record has the wrong length")?,
    );
    if stored != header {
        bail!("stored metadata does not match the header that was sent");
    }
    println!("  Stored:  metadata at 0x{:08x} matches", layout.metadata_addr);

    if verbose {
        println!();
        println!("Flash log:");
        for op in link.flash().log() {
            println!("  {op:x?}");
        }
        println!();
        println!("Indicators:");
        for (indicator, on) in link.indicators() {
            println!("  {indicator:?} {}", if *on { "on" } else { "off" });
        }
    }
    Ok(())
}
