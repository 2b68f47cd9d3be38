// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Low-level GPIO drivers.
//!
//! Two hardware backends implement [`PinBackend`]: the native SoC header and the
//! MCP23017 I²C expander. A third, test-only [`mock::MockBackend`] backs the
//! Pin Coordination Engine's unit tests without touching real hardware.

pub mod expander;
pub mod mock;
pub mod native;

pub use expander::ExpanderBackend;
pub use mock::MockBackend;
pub use native::NativeBackend;

use crate::error::Result;

/// Digital read/write capability a PCE worker needs from a pin, independent of
/// whether it sits behind the native header or an expander bank.
#[async_trait::async_trait]
pub trait PinBackend: Send + Sync {
    /// Reads the current electrical state. `true` is high.
    async fn read_state(&self) -> Result<bool>;

    /// Drives the pin to the given electrical state.
    async fn write_state(&self, value: bool) -> Result<()>;

    /// A human-readable label for logging (e.g. `"mcp3:5"`, `"gpio0"`).
    fn display_label(&self) -> String;
}
