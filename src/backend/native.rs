// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Native SoC header backend.
//!
//! Talks to the board's own GPIO header rather than an I²C expander. The
//! header is opened once per process; each [`NativeBackend`] just remembers
//! which line it drives.

use tokio::sync::Mutex;

use super::PinBackend;
use crate::error::{PanelError, Result};
use crate::pin::Pin;

/// Tracks whether the native header has been opened, mirroring the "open once"
/// lifecycle the Pin Coordination Engine expects to manage.
#[derive(Default)]
pub struct NativeHeader {
    opened: Mutex<bool>,
}

impl NativeHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the header on first call; subsequent calls are no-ops.
    pub async fn ensure_open(&self) -> Result<()> {
        let mut opened = self.opened.lock().await;
        if !*opened {
            // TODO: open the real memory-mapped GPIO header once this crate
            // targets actual ARM hardware; see ExpanderBackend for the same gap.
            *opened = true;
        }
        Ok(())
    }

    pub async fn close(&self) {
        let mut opened = self.opened.lock().await;
        *opened = false;
    }
}

/// A single native header line, configured as either input or output.
pub struct NativeBackend {
    pin: Pin,
    is_output: bool,
}

impl NativeBackend {
    pub fn new(pin: Pin, is_output: bool) -> Self {
        Self { pin, is_output }
    }
}

#[async_trait::async_trait]
impl PinBackend for NativeBackend {
    async fn read_state(&self) -> Result<bool> {
        // TODO: read the real header line once this crate targets actual ARM
        // hardware. Until then callers only exercise MockBackend in tests.
        Err(PanelError::BackendIO {
            pin: self.pin,
            source: "native header driver not implemented".to_string(),
        })
    }

    async fn write_state(&self, _value: bool) -> Result<()> {
        if !self.is_output {
            return Err(PanelError::BackendIO {
                pin: self.pin,
                source: "pin is not configured as output".to_string(),
            });
        }
        Err(PanelError::BackendIO {
            pin: self.pin,
            source: "native header driver not implemented".to_string(),
        })
    }

    fn display_label(&self) -> String {
        format!("gpio{}", self.pin.line())
    }
}
