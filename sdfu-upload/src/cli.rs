// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

use sdfu_common::{FlashLayout, FLASH_PAGE_SIZE};

use crate::commands;
use crate::transport::SerialLink;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "sdfu-upload")]
#[command(about = "Firmware upload tool for the serial DFU bootloader")]
#[command(version = env!("SDFU_VERSION"))]
pub struct Cli {
    /// Serial port (e.g., /dev/ttyUSB0)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate of the bootloader UART
    #[arg(short, long, default_value_t = 38_400)]
    pub baud: u32,

    /// How long to wait for each ACK, in milliseconds
    #[arg(long, default_value_t = 2_000)]
    pub timeout_ms: u64,

    /// Erase page size of the target flash
    #[arg(long, default_value_t = FLASH_PAGE_SIZE)]
    pub page_size: u32,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Upload a firmware image
    Upload {
        /// Firmware binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print the transfer header for an image
    Header {
        /// Firmware binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Write the raw 24-byte header to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a transfer against a simulated device (no hardware needed)
    Simulate {
        /// Firmware binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Application base address in hex
        #[arg(long, default_value = "0x10010000", value_parser = parse_hex_u32)]
        app_base: u32,

        /// Metadata page address in hex
        #[arg(long, default_value = "0x1000C000", value_parser = parse_hex_u32)]
        metadata_addr: u32,

        /// Print every simulated flash operation
        #[arg(short, long)]
        verbose: bool,
    },
}

/// Parse a hex string (with or without 0x prefix) into a u32.
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(s, 16).map_err(|e| format!("invalid hex value: {e}"))
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Upload { file } => {
            let port = cli
                .port
                .as_deref()
                .ok_or_else(|| anyhow!("--port is required for this command"))?;
            let mut link =
                SerialLink::open(port, cli.baud, Duration::from_millis(cli.timeout_ms))?;
            commands::upload(&mut link, &file, cli.page_size)
        }
        Commands::Header { file, output } => {
            commands::header(&file, output.as_deref(), cli.page_size)
        }
        Commands::Simulate {
            file,
            app_base,
            metadata_addr,
            verbose,
        } => commands::simulate(
            &file,
            FlashLayout::new(app_base, metadata_addr),
            cli.page_size,
            verbose,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdfu_common::{APP_BASE, METADATA_ADDR};

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x10010000"), Ok(0x1001_0000));
        assert_eq!(parse_hex_u32("0X800"), Ok(0x800));
        assert_eq!(parse_hex_u32("c000"), Ok(0xC000));
        assert!(parse_hex_u32("0xZZ").is_err());
    }

    #[test]
    fn test_defaults_match_reference_board() {
        let cli = Cli::try_parse_from(["sdfu-upload", "simulate", "fw.bin"]).unwrap();

        assert_eq!(cli.baud, 38_400);
        assert_eq!(cli.page_size, FLASH_PAGE_SIZE);
        assert!(cli.port.is_none());
        match cli.command {
            Commands::Simulate {
                app_base,
                metadata_addr,
                ..
            } => {
                assert_eq!(app_base, APP_BASE);
                assert_eq!(metadata_addr, METADATA_ADDR);
            }
            _ => panic!("expected simulate"),
        }
    }

    #[test]
    fn test_upload_requires_port() {
        let cli = Cli::try_parse_from(["sdfu-upload", "upload", "fw.bin"]).unwrap();

        let err = run(cli).unwrap_err();

        assert!(err.to_string().contains("--port"), "{err}");
    }
}
