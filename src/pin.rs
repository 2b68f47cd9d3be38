// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Pin addressing.
//!
//! A [`Pin`] is a single byte encoding a physical GPIO line. The address space is
//! partitioned: indices `0..128` address an MCP23017 expander (eight banks of
//! sixteen lines each), indices `128..256` address the SoC's native header. The
//! encoding is stable — it is persisted in the database and used as a map key —
//! so the partition boundary and bit layout must never change.

use std::fmt;

use crate::error::{PanelError, Result};

const EXPANDER_BANKS: u8 = 8;
const EXPANDER_LINES: u8 = 16;
const FIRST_NATIVE_INDEX: u16 = EXPANDER_BANKS as u16 * EXPANDER_LINES as u16;

/// A physical GPIO line, expander or native, encoded as a single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Pin(u8);

impl Pin {
    /// Builds the pin addressing an expander line: `bank < 8`, `line < 16`.
    pub fn make_expander_pin(bank: u8, line: u8) -> Result<Self> {
        if bank >= EXPANDER_BANKS {
            return Err(PanelError::OutOfRange { value: bank as u16 });
        }
        if line >= EXPANDER_LINES {
            return Err(PanelError::OutOfRange { value: line as u16 });
        }
        Ok(Pin(bank * EXPANDER_LINES + line))
    }

    /// Builds the pin addressing a native header line: `line <= 127`.
    pub fn make_native_pin(line: u8) -> Result<Self> {
        let value = FIRST_NATIVE_INDEX + line as u16;
        if value > u8::MAX as u16 {
            return Err(PanelError::OutOfRange { value });
        }
        Ok(Pin(value as u8))
    }

    /// Reconstructs a pin from its stored/wire byte value without re-validating
    /// the partition (the value is assumed to have come from a prior `Pin`).
    pub fn from_raw(value: u8) -> Self {
        Pin(value)
    }

    pub fn raw(self) -> u8 {
        self.0
    }

    pub fn is_expander(self) -> bool {
        (self.0 as u16) < FIRST_NATIVE_INDEX
    }

    /// The expander bank this pin belongs to, or `OutOfRange` if this is a native pin.
    pub fn bank(self) -> Result<u8> {
        if self.is_expander() {
            Ok(self.0 / EXPANDER_LINES)
        } else {
            Err(PanelError::OutOfRange { value: self.0 as u16 })
        }
    }

    /// The line index: within the bank for an expander pin, within the header for a native pin.
    pub fn line(self) -> u8 {
        if self.is_expander() {
            self.0 % EXPANDER_LINES
        } else {
            self.0 - FIRST_NATIVE_INDEX as u8
        }
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_expander() {
            write!(f, "mcp{}:{}", self.bank().unwrap(), self.line())
        } else {
            write!(f, "gpio{}", self.line())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expander_encoding_matches_spec_example() {
        assert_eq!(Pin::make_expander_pin(3, 5).unwrap().raw(), 53);
    }

    #[test]
    fn native_encoding_matches_spec_example() {
        assert_eq!(Pin::make_native_pin(0).unwrap().raw(), 128);
    }

    #[test]
    fn native_line_out_of_range() {
        assert!(matches!(
            Pin::make_native_pin(128),
            Err(PanelError::OutOfRange { .. })
        ));
    }

    #[test]
    fn expander_bank_out_of_range() {
        assert!(matches!(
            Pin::make_expander_pin(8, 0),
            Err(PanelError::OutOfRange { .. })
        ));
    }

    #[test]
    fn expander_line_out_of_range() {
        assert!(matches!(
            Pin::make_expander_pin(0, 16),
            Err(PanelError::OutOfRange { .. })
        ));
    }

    #[test]
    fn bank_and_line_round_trip() {
        let pin = Pin::make_expander_pin(5, 9).unwrap();
        assert!(pin.is_expander());
        assert_eq!(pin.bank().unwrap(), 5);
        assert_eq!(pin.line(), 9);
    }

    #[test]
    fn native_pin_is_not_expander() {
        let pin = Pin::make_native_pin(1).unwrap();
        assert!(!pin.is_expander());
        assert!(pin.bank().is_err());
        assert_eq!(pin.line(), 1);
    }
}
