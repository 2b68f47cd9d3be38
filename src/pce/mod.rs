// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! The Pin Coordination Engine: the sole owner of every open hardware pin.
//!
//! Registers `(input, output)` pairs with a [`Behaviour`], spawns one polling
//! worker per pair, and serialises mutation of the pair table behind a single
//! mutex. Workers never hold that mutex during their tick sleep — they read
//! `output_desired` through a shared atomic and keep the rest of their state
//! task-local, tolerating the one-tick lag the design accepts in exchange.

mod backend_factory;
mod worker;

pub use backend_factory::{BackendFactory, HardwareBackendFactory, MockBackendFactory};
pub use worker::{Behaviour, CHECK_INTERVAL, IDLE, TIMED_PIN_TIME};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::{PanelError, Result};
use crate::pin::Pin;

struct PairEntry {
    output_pin: Pin,
    behaviour: Behaviour,
    output_desired: Arc<AtomicBool>,
    terminated: Arc<AtomicBool>,
    /// The currently armed auto-release task for a Timed pair, if any. Lives
    /// inside the same table-mutex-guarded entry `toggle_pin` mutates, so
    /// "cancel previous, arm new" is atomic with respect to concurrent
    /// `toggle_pin` calls on this pair.
    timed_release: Option<JoinHandle<()>>,
}

/// Long-lived supervisor owning every registered pin pair and backend handle.
pub struct Engine {
    pairs: Mutex<HashMap<Pin, PairEntry>>,
    active: Arc<AtomicBool>,
    factory: Arc<dyn BackendFactory>,
    worker_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Engine {
    pub fn new(factory: Arc<dyn BackendFactory>) -> Self {
        Self {
            pairs: Mutex::new(HashMap::new()),
            active: Arc::new(AtomicBool::new(true)),
            factory,
            worker_handles: Mutex::new(Vec::new()),
        }
    }

    pub fn with_hardware() -> Self {
        Self::new(Arc::new(HardwareBackendFactory::new()))
    }

    /// Fails with `InUse` if any of `pins` is currently registered as an input
    /// or output of any pair.
    pub async fn is_registered(&self, pins: &[Pin]) -> Result<()> {
        let table = self.pairs.lock().await;
        Self::check_unused(&table, pins)
    }

    fn check_unused(table: &HashMap<Pin, PairEntry>, pins: &[Pin]) -> Result<()> {
        for (input, entry) in table.iter() {
            for pin in pins {
                if pin == input || *pin == entry.output_pin {
                    return Err(PanelError::InUse { pin: *pin });
                }
            }
        }
        Ok(())
    }

    pub async fn register_pair(&self, input: Pin, output: Pin, behaviour: Behaviour) -> Result<()> {
        if !self.active.load(Ordering::SeqCst) {
            return Err(PanelError::Inactive);
        }

        let mut table = self.pairs.lock().await;
        Self::check_unused(&table, &[input, output])?;

        let input_backend = self.factory.make_backend(input, false).await?;
        let output_backend = self.factory.make_backend(output, true).await?;

        let output_desired = Arc::new(AtomicBool::new(IDLE));
        let terminated = Arc::new(AtomicBool::new(false));

        let handle = match behaviour {
            Behaviour::Toggle => tokio::spawn(worker::toggle_worker(
                input_backend,
                output_backend,
                output_desired.clone(),
                terminated.clone(),
                self.active.clone(),
                output,
            )),
            Behaviour::Timed => tokio::spawn(worker::timed_worker(
                input_backend,
                output_backend,
                output_desired.clone(),
                terminated.clone(),
                self.active.clone(),
                output,
            )),
        };
        self.worker_handles.lock().await.push(handle);

        table.insert(
            input,
            PairEntry {
                output_pin: output,
                behaviour,
                output_desired,
                terminated,
                timed_release: None,
            },
        );
        info!("registered pair input={input} output={output} behaviour={behaviour:?}");
        Ok(())
    }

    pub async fn unregister_pair(&self, input: Pin, output: Pin) -> Result<()> {
        if !self.active.load(Ordering::SeqCst) {
            return Err(PanelError::Inactive);
        }
        let mut table = self.pairs.lock().await;
        Self::internal_unregister(&mut table, input, output)?;
        info!("unregistered pair input={input} output={output}");
        Ok(())
    }

    fn internal_unregister(table: &mut HashMap<Pin, PairEntry>, input: Pin, output: Pin) -> Result<()> {
        let entry = table
            .get(&input)
            .ok_or(PanelError::NotFound { what: "pin pair", id: input.raw() as i64 })?;
        if entry.output_pin != output {
            return Err(PanelError::InvalidInput {
                reason: format!("pin {output} is not the output assigned to input {input}"),
            });
        }
        entry.terminated.store(true, Ordering::SeqCst);
        table.remove(&input);
        Ok(())
    }

    /// Mutates `output_desired` per the pair's behaviour. For a Timed pair,
    /// cancels any previously armed auto-release task and arms a new one.
    pub async fn toggle_pin(&self, input: Pin) -> Result<()> {
        if !self.active.load(Ordering::SeqCst) {
            return Err(PanelError::Inactive);
        }
        let mut table = self.pairs.lock().await;
        let entry = table
            .get_mut(&input)
            .ok_or(PanelError::NotFound { what: "pin pair", id: input.raw() as i64 })?;

        match entry.behaviour {
            Behaviour::Toggle => {
                let current = entry.output_desired.load(Ordering::SeqCst);
                entry.output_desired.store(!current, Ordering::SeqCst);
            }
            Behaviour::Timed => {
                entry.output_desired.store(!IDLE, Ordering::SeqCst);
                if let Some(previous) = entry.timed_release.take() {
                    previous.abort();
                }
                let desired = entry.output_desired.clone();
                entry.timed_release = Some(tokio::spawn(async move {
                    tokio::time::sleep(TIMED_PIN_TIME).await;
                    desired.store(IDLE, Ordering::SeqCst);
                }));
            }
        }
        Ok(())
    }

    pub async fn get_pin_state(&self, input: Pin) -> Result<bool> {
        let table = self.pairs.lock().await;
        let entry = table
            .get(&input)
            .ok_or(PanelError::NotFound { what: "pin pair", id: input.raw() as i64 })?;
        Ok(entry.output_desired.load(Ordering::SeqCst))
    }

    /// Unregisters every pair, waits for every worker to finish, then releases
    /// every backend handle. Idempotent-by-error: a second call reports `Inactive`.
    pub async fn close(&self) -> Result<()> {
        let was_active = self.active.swap(false, Ordering::SeqCst);
        if !was_active {
            return Err(PanelError::Inactive);
        }
        {
            let mut table = self.pairs.lock().await;
            for entry in table.values() {
                entry.terminated.store(true, Ordering::SeqCst);
            }
            table.clear();
        }
        let mut handles = self.worker_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        self.factory.close().await;
        info!("engine closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn engine_with_mocks() -> (Engine, MockBackendFactory) {
        let factory = MockBackendFactory::new();
        (Engine::new(Arc::new(factory.clone())), factory)
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_edge_flips_output_once_per_edge() {
        let (engine, factory) = engine_with_mocks();
        let input = Pin::make_native_pin(0).unwrap();
        let output = Pin::make_native_pin(1).unwrap();
        engine.register_pair(input, output, Behaviour::Toggle).await.unwrap();

        let input_cell = factory.cell(input).await;
        let output_cell = factory.cell(output).await;

        // physical press: input goes low
        input_cell.set(false).await;
        tokio::time::advance(CHECK_INTERVAL * 2).await;
        assert_eq!(output_cell.writes().await, vec![false]);

        // held steady: no further transition
        tokio::time::advance(CHECK_INTERVAL * 3).await;
        assert_eq!(output_cell.writes().await, vec![false]);

        // release edge
        input_cell.set(true).await;
        tokio::time::advance(CHECK_INTERVAL * 2).await;
        assert_eq!(output_cell.writes().await, vec![false, true]);

        engine.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_pin_toggles_desired_state() {
        let (engine, factory) = engine_with_mocks();
        let input = Pin::make_native_pin(0).unwrap();
        let output = Pin::make_native_pin(1).unwrap();
        engine.register_pair(input, output, Behaviour::Toggle).await.unwrap();

        engine.toggle_pin(input).await.unwrap();
        tokio::time::advance(CHECK_INTERVAL * 2).await;
        let output_cell = factory.cell(output).await;
        assert_eq!(output_cell.writes().await, vec![false]);

        engine.toggle_pin(input).await.unwrap();
        tokio::time::advance(CHECK_INTERVAL * 2).await;
        assert_eq!(output_cell.writes().await, vec![false, true]);

        engine.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn timed_pulse_returns_to_idle_after_duration() {
        let (engine, factory) = engine_with_mocks();
        let input = Pin::make_native_pin(0).unwrap();
        let output = Pin::make_native_pin(1).unwrap();
        engine.register_pair(input, output, Behaviour::Timed).await.unwrap();

        engine.toggle_pin(input).await.unwrap();
        tokio::time::advance(CHECK_INTERVAL * 2).await;
        let output_cell = factory.cell(output).await;
        assert_eq!(output_cell.get().await, false);

        tokio::time::advance(TIMED_PIN_TIME + CHECK_INTERVAL * 2).await;
        assert_eq!(output_cell.get().await, true);

        engine.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn second_pulse_extends_the_deadline() {
        let (engine, factory) = engine_with_mocks();
        let input = Pin::make_native_pin(0).unwrap();
        let output = Pin::make_native_pin(1).unwrap();
        engine.register_pair(input, output, Behaviour::Timed).await.unwrap();

        engine.toggle_pin(input).await.unwrap();
        tokio::time::advance(TIMED_PIN_TIME - Duration::from_millis(500)).await;
        engine.toggle_pin(input).await.unwrap(); // restart the deadline
        tokio::time::advance(Duration::from_millis(700)).await;

        let output_cell = factory.cell(output).await;
        assert_eq!(output_cell.get().await, false, "still active: deadline was extended");

        tokio::time::advance(TIMED_PIN_TIME).await;
        assert_eq!(output_cell.get().await, true);

        engine.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn close_drives_every_output_idle() {
        let (engine, factory) = engine_with_mocks();
        let input = Pin::make_native_pin(0).unwrap();
        let output = Pin::make_native_pin(1).unwrap();
        engine.register_pair(input, output, Behaviour::Toggle).await.unwrap();
        engine.toggle_pin(input).await.unwrap();
        tokio::time::advance(CHECK_INTERVAL * 2).await;

        engine.close().await.unwrap();
        let output_cell = factory.cell(output).await;
        assert_eq!(output_cell.last_write().await, Some(true));
    }

    #[tokio::test]
    async fn close_is_not_idempotent() {
        let (engine, _factory) = engine_with_mocks();
        engine.close().await.unwrap();
        assert!(matches!(engine.close().await, Err(PanelError::Inactive)));
    }

    #[tokio::test]
    async fn registering_an_in_use_pin_fails() {
        let (engine, _factory) = engine_with_mocks();
        let input = Pin::make_native_pin(0).unwrap();
        let output = Pin::make_native_pin(1).unwrap();
        engine.register_pair(input, output, Behaviour::Toggle).await.unwrap();

        let other_output = Pin::make_native_pin(2).unwrap();
        assert!(matches!(
            engine.register_pair(input, other_output, Behaviour::Toggle).await,
            Err(PanelError::InUse { .. })
        ));
    }

    #[tokio::test]
    async fn unregister_rejects_mismatched_output() {
        let (engine, _factory) = engine_with_mocks();
        let input = Pin::make_native_pin(0).unwrap();
        let output = Pin::make_native_pin(1).unwrap();
        let wrong_output = Pin::make_native_pin(2).unwrap();
        engine.register_pair(input, output, Behaviour::Toggle).await.unwrap();
        assert!(engine.unregister_pair(input, wrong_output).await.is_err());
        engine.unregister_pair(input, output).await.unwrap();
    }
}
