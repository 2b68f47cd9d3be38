// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Builds a [`PinBackend`] for a given [`Pin`], dispatching on its partition
//! (expander vs native) so the engine never has to know which concrete driver
//! a worker is holding. Tests substitute [`MockBackendFactory`] to run the
//! whole worker-loop algorithm without hardware.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::backend::{ExpanderBackend, ExpanderBus, MockBackend, MockCell, NativeBackend, NativeHeader, PinBackend};
use crate::error::Result;
use crate::pin::Pin;

#[async_trait::async_trait]
pub trait BackendFactory: Send + Sync {
    async fn make_backend(&self, pin: Pin, is_output: bool) -> Result<Arc<dyn PinBackend>>;

    /// Releases every handle this factory has opened. Called once from `Engine::close`.
    async fn close(&self);
}

/// Dispatches to [`NativeBackend`] or [`ExpanderBackend`] depending on the pin's partition.
pub struct HardwareBackendFactory {
    native_header: NativeHeader,
    expander_bus: ExpanderBus,
}

impl HardwareBackendFactory {
    pub fn new() -> Self {
        Self {
            native_header: NativeHeader::new(),
            expander_bus: ExpanderBus::new(),
        }
    }
}

impl Default for HardwareBackendFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BackendFactory for HardwareBackendFactory {
    async fn make_backend(&self, pin: Pin, is_output: bool) -> Result<Arc<dyn PinBackend>> {
        if pin.is_expander() {
            self.expander_bus.ensure_bank_open(pin.bank()?).await?;
            Ok(Arc::new(ExpanderBackend::new(pin, is_output, self.expander_bus.clone())))
        } else {
            self.native_header.ensure_open().await?;
            Ok(Arc::new(NativeBackend::new(pin, is_output)))
        }
    }

    async fn close(&self) {
        self.native_header.close().await;
        self.expander_bus.close_all().await;
    }
}

/// Test-only factory handing out [`MockBackend`]s over a shared per-pin cell
/// map, so a test can flip a pin's input and inspect the writes made to its
/// paired output without any real hardware.
#[derive(Clone, Default)]
pub struct MockBackendFactory {
    cells: Arc<Mutex<HashMap<Pin, MockCell>>>,
}

impl MockBackendFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cell backing `pin`, creating it (idle) on first access.
    pub async fn cell(&self, pin: Pin) -> MockCell {
        let mut cells = self.cells.lock().await;
        cells.entry(pin).or_insert_with(MockCell::default).clone()
    }
}

#[async_trait::async_trait]
impl BackendFactory for MockBackendFactory {
    async fn make_backend(&self, pin: Pin, _is_output: bool) -> Result<Arc<dyn PinBackend>> {
        let cell = self.cell(pin).await;
        Ok(Arc::new(MockBackend::for_pin(pin, cell)))
    }

    async fn close(&self) {}
}
