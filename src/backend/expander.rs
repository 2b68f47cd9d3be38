// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! MCP23017 I²C expander backend.
//!
//! Up to eight expanders share I²C bus 1; the bus handle is wrapped in an
//! `Arc<Mutex<_>>` so every bank's backend serialises through the same lock,
//! matching the single-bus contract the Pin Coordination Engine assumes.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::PinBackend;
use crate::error::{PanelError, Result};
use crate::pin::Pin;

const I2C_BUS: u8 = 1;

/// Shared handle to the I²C bus all expander banks multiplex onto.
#[derive(Clone)]
pub struct ExpanderBus {
    inner: Arc<Mutex<ExpanderBusState>>,
}

struct ExpanderBusState {
    opened_banks: std::collections::HashSet<u8>,
}

impl ExpanderBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ExpanderBusState {
                opened_banks: std::collections::HashSet::new(),
            })),
        }
    }

    /// Opens the given bank's MCP23017 device on first use.
    pub async fn ensure_bank_open(&self, bank: u8) -> Result<()> {
        let mut state = self.inner.lock().await;
        if !state.opened_banks.contains(&bank) {
            // TODO: open /dev/i2c-1 and address this bank's MCP23017 once this
            // crate targets actual ARM hardware (bus = I2C_BUS, addr = 0x20+bank).
            let _ = I2C_BUS;
            state.opened_banks.insert(bank);
        }
        Ok(())
    }

    pub async fn close_all(&self) {
        let mut state = self.inner.lock().await;
        state.opened_banks.clear();
    }
}

impl Default for ExpanderBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A single expander line, configured as input (with internal pull-up) or output.
pub struct ExpanderBackend {
    pin: Pin,
    is_output: bool,
    bus: ExpanderBus,
}

impl ExpanderBackend {
    pub fn new(pin: Pin, is_output: bool, bus: ExpanderBus) -> Self {
        Self { pin, is_output, bus }
    }
}

#[async_trait::async_trait]
impl PinBackend for ExpanderBackend {
    async fn read_state(&self) -> Result<bool> {
        let bank = self.pin.bank()?;
        self.bus.ensure_bank_open(bank).await?;
        // TODO: read the real MCP23017 register once this crate targets actual
        // ARM hardware; inputs are configured with internal pull-up enabled.
        Err(PanelError::BackendIO {
            pin: self.pin,
            source: "mcp23017 driver not implemented".to_string(),
        })
    }

    async fn write_state(&self, _value: bool) -> Result<()> {
        if !self.is_output {
            return Err(PanelError::BackendIO {
                pin: self.pin,
                source: "pin is not configured as output".to_string(),
            });
        }
        let bank = self.pin.bank()?;
        self.bus.ensure_bank_open(bank).await?;
        Err(PanelError::BackendIO {
            pin: self.pin,
            source: "mcp23017 driver not implemented".to_string(),
        })
    }

    fn display_label(&self) -> String {
        format!("mcp{}:{}", self.pin.bank().unwrap_or(0), self.pin.line())
    }
}
