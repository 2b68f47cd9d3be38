// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Test-only backend that simulates a single electrical line in memory.
//!
//! Used by the Pin Coordination Engine's unit tests so worker-loop behaviour
//! (toggle edge discipline, timed pulses, shutdown) can be exercised without a
//! real I²C bus or GPIO header.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::PinBackend;
use crate::error::Result;
use crate::pin::Pin;

/// A single shared boolean cell two [`MockBackend`] handles (input side, test
/// harness side) can both observe — the test drives the input cell directly
/// and asserts on the output cell's write history.
#[derive(Clone)]
pub struct MockCell {
    inner: Arc<Mutex<MockCellState>>,
}

struct MockCellState {
    value: bool,
    writes: Vec<bool>,
}

impl MockCell {
    pub fn new(initial: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockCellState {
                value: initial,
                writes: Vec::new(),
            })),
        }
    }

    pub async fn set(&self, value: bool) {
        self.inner.lock().await.value = value;
    }

    pub async fn get(&self) -> bool {
        self.inner.lock().await.value
    }

    /// All values ever written through a [`MockBackend`] bound to this cell, in order.
    pub async fn writes(&self) -> Vec<bool> {
        self.inner.lock().await.writes.clone()
    }

    pub async fn last_write(&self) -> Option<bool> {
        self.inner.lock().await.writes.last().copied()
    }
}

impl Default for MockCell {
    fn default() -> Self {
        Self::new(true)
    }
}

pub struct MockBackend {
    label: String,
    cell: MockCell,
}

impl MockBackend {
    pub fn new(label: impl Into<String>, cell: MockCell) -> Self {
        Self {
            label: label.into(),
            cell,
        }
    }

    pub fn for_pin(pin: Pin, cell: MockCell) -> Self {
        Self::new(pin.to_string(), cell)
    }
}

#[async_trait::async_trait]
impl PinBackend for MockBackend {
    async fn read_state(&self) -> Result<bool> {
        Ok(self.cell.get().await)
    }

    async fn write_state(&self, value: bool) -> Result<()> {
        let mut state = self.cell.inner.lock().await;
        state.value = value;
        state.writes.push(value);
        Ok(())
    }

    fn display_label(&self) -> String {
        self.label.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_updates_value_and_history() {
        let cell = MockCell::new(true);
        let backend = MockBackend::new("test", cell.clone());
        backend.write_state(false).await.unwrap();
        assert!(!backend.read_state().await.unwrap());
        assert_eq!(cell.writes().await, vec![false]);
    }
}
