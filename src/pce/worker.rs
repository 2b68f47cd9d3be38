// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Per-pair polling workers.
//!
//! One task per registered pair, dispatched on [`Behaviour`]. Workers never
//! hold the pair-table mutex: they read `output_desired` through a shared
//! atomic and keep `input_observed`/`output_current` as task-local state,
//! exactly as the pair-table/per-pair split the engine's concurrency model
//! requires.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::warn;

use crate::backend::PinBackend;
use crate::pin::Pin;

pub const CHECK_INTERVAL: Duration = Duration::from_millis(100);
pub const TIMED_PIN_TIME: Duration = Duration::from_secs(2);

/// `true` means relay de-energised / button not pressed (pull-up wiring).
pub const IDLE: bool = true;

/// The behaviour a registered pair runs — a sum type dispatched by `tick`,
/// never a runtime type switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    /// Latching: each input edge flips the output (lights).
    Toggle,
    /// Momentary: output mirrors input while held; a pulse drives it active
    /// for a fixed duration (sunblinds).
    Timed,
}

/// Runs a Toggle pair until `active` clears or `terminated` is set, then
/// writes the idle value and returns.
pub async fn toggle_worker(
    input: Arc<dyn PinBackend>,
    output: Arc<dyn PinBackend>,
    output_desired: Arc<AtomicBool>,
    terminated: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    output_pin: Pin,
) {
    let mut input_observed = IDLE;
    let mut output_current = IDLE;
    loop {
        tokio::time::sleep(CHECK_INTERVAL).await;
        if !active.load(Ordering::SeqCst) || terminated.load(Ordering::SeqCst) {
            if let Err(e) = output.write_state(IDLE).await {
                warn!("pin {output_pin} inactive write error: {e}");
            }
            break;
        }

        if output_desired.load(Ordering::SeqCst) == output_current {
            match input.read_state().await {
                Ok(v) => {
                    if v == input_observed {
                        continue;
                    }
                    input_observed = v;
                    output_desired.store(!output_current, Ordering::SeqCst);
                }
                Err(e) => {
                    warn!("pin {output_pin} read error: {e}");
                    continue;
                }
            }
        }

        let desired = output_desired.load(Ordering::SeqCst);
        if desired != output_current {
            match output.write_state(desired).await {
                Ok(()) => output_current = desired,
                Err(e) => warn!("pin {output_pin} write error: {e}"),
            }
        }
    }
}

/// Runs a Timed pair until `active` clears or `terminated` is set, then
/// writes the idle value and returns.
pub async fn timed_worker(
    input: Arc<dyn PinBackend>,
    output: Arc<dyn PinBackend>,
    output_desired: Arc<AtomicBool>,
    terminated: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    output_pin: Pin,
) {
    let mut output_current = IDLE;
    loop {
        tokio::time::sleep(CHECK_INTERVAL).await;
        if !active.load(Ordering::SeqCst) || terminated.load(Ordering::SeqCst) {
            if let Err(e) = output.write_state(IDLE).await {
                warn!("pin {output_pin} inactive write error: {e}");
            }
            break;
        }

        let desired = output_desired.load(Ordering::SeqCst);
        if desired != IDLE {
            if output_current == IDLE {
                let next = !output_current;
                match output.write_state(next).await {
                    Ok(()) => output_current = next,
                    Err(e) => warn!("pin {output_pin} write error: {e}"),
                }
            }
        } else {
            match input.read_state().await {
                Ok(v) => {
                    if v != output_current {
                        match output.write_state(v).await {
                            Ok(()) => output_current = v,
                            Err(e) => warn!("pin {output_pin} write error: {e}"),
                        }
                    }
                }
                Err(e) => {
                    warn!("pin {output_pin} read error: {e}");
                    continue;
                }
            }
        }
    }
}
