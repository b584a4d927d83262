// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serial port link to the bootloader UART.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serialport::SerialPort;

use crate::sender::Link;

pub struct SerialLink {
    port: Box<dyn SerialPort>,
    port_name: String,
}

impl SerialLink {
    /// Open `port_name` at `baud` (8N1). `timeout` bounds every reply wait.
    pub fn open(port_name: &str, baud: u32, timeout: Duration) -> Result<Self> {
        let port = serialport::new(port_name, baud)
            .timeout(timeout)
            .open()
            .with_context(|| format!("Failed to open {port_name}"))?;

        Ok(Self {
            port,
            port_name: port_name.to_string(),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Discard anything already buffered, such as the boot banner.
    /// Returns the number of bytes thrown away.
    pub fn drain(&mut self) -> Result<usize> {
        let saved_timeout = self.port.timeout();
        self.port
            .set_timeout(Duration::from_millis(1))
            .context("reducing timeout for drain")?;

        let mut buffer = [0u8; 64];
        let mut cruft = 0usize;
        let outcome = loop {
            match self.port.read(&mut buffer) {
                Ok(0) => break Ok(()),
                Ok(n) => cruft += n,
                Err(e) if e.kind() == ErrorKind::TimedOut => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        self.port
            .set_timeout(saved_timeout)
            .context("restoring timeout after drain")?;
        outcome.context("draining serial port")?;
        Ok(cruft)
    }
}

impl Link for SerialLink {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.port
            .write_all(data)
            .with_context(|| format!("Failed to write to {}", self.port_name))?;
        self.port.flush()?;
        Ok(())
    }

    fn read_reply(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(1) => Ok(byte[0]),
            Ok(_) => bail!("{} closed", self.port_name),
            Err(e) if e.kind() == ErrorKind::TimedOut => {
                bail!("no reply from device within {:?}", self.port.timeout())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read from {}", self.port_name)),
        }
    }
}
