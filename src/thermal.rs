// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Thermal sampling: a fixed-capacity ring buffer per thermometer and the
//! periodic task that fills it from a [`OneWireSource`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use rand::Rng;
use tokio::sync::Mutex;

use crate::error::{PanelError, Result};
use crate::persistence::Persistence;

/// Ring buffer capacity: the most recent 100 samples per thermometer.
pub const BLOCK_CAPACITY: usize = 100;

/// A single (celsius, unix-seconds) reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalPoint {
    pub celsius: f64,
    pub timestamp: i64,
}

/// Fixed-capacity ring of the most recent readings for one thermometer.
pub struct ThermalBlock {
    buf: Vec<ThermalPoint>,
    next: usize,
    full: bool,
}

impl ThermalBlock {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(BLOCK_CAPACITY),
            next: 0,
            full: false,
        }
    }

    pub fn len(&self) -> usize {
        if self.full {
            self.buf.len()
        } else {
            self.next
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add(&mut self, point: ThermalPoint) {
        if self.buf.len() < BLOCK_CAPACITY {
            self.buf.push(point);
        } else {
            self.buf[self.next] = point;
        }
        self.next += 1;
        if self.next >= BLOCK_CAPACITY {
            self.next = 0;
            self.full = true;
        }
    }

    /// The most recently added point, or an error if nothing has been added yet.
    pub fn last(&self) -> Result<ThermalPoint> {
        if self.next == 0 {
            if self.full {
                return Ok(self.buf[self.buf.len() - 1]);
            }
            return Err(PanelError::NotFound { what: "thermal block", id: 0 });
        }
        Ok(self.buf[self.next - 1])
    }

    /// All samples in chronological order.
    pub fn read(&self) -> Vec<ThermalPoint> {
        if !self.full {
            return self.buf[..self.next].to_vec();
        }
        let mut ret = Vec::with_capacity(self.buf.len());
        ret.extend_from_slice(&self.buf[self.next..]);
        ret.extend_from_slice(&self.buf[..self.next]);
        ret
    }
}

impl Default for ThermalBlock {
    fn default() -> Self {
        Self::new()
    }
}

/// Enumerates sensor identifiers and reads a named sensor's temperature. Two
/// implementations: the real 1-wire sysfs reader and a synthetic generator
/// for development/testing, selected once at construction so the sampler's
/// tick logic never branches on configuration.
#[async_trait::async_trait]
pub trait OneWireSource: Send + Sync {
    async fn enumerate(&self) -> Result<Vec<String>>;
    async fn read_celsius(&self, name: &str) -> Result<f64>;
}

/// Reads `/sys/bus/w1/devices/*/w1_slave`-style entries.
pub struct SysfsOneWireSource {
    base_dir: std::path::PathBuf,
}

impl SysfsOneWireSource {
    pub fn new(base_dir: impl Into<std::path::PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }
}

#[async_trait::async_trait]
impl OneWireSource for SysfsOneWireSource {
    async fn enumerate(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(_) => return Ok(names),
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    async fn read_celsius(&self, name: &str) -> Result<f64> {
        let path = self.base_dir.join(name).join("w1_slave");
        let contents = tokio::fs::read_to_string(&path).await.map_err(|e| PanelError::BackendIO {
            pin: crate::pin::Pin::from_raw(0),
            source: e.to_string(),
        })?;
        parse_w1_slave(&contents)
    }
}

fn parse_w1_slave(contents: &str) -> Result<f64> {
    let raw = contents
        .lines()
        .nth(1)
        .and_then(|line| line.split("t=").nth(1))
        .ok_or_else(|| PanelError::BackendIO {
            pin: crate::pin::Pin::from_raw(0),
            source: "malformed w1_slave contents".to_string(),
        })?;
    let milli: i64 = raw.trim().parse().map_err(|_| PanelError::BackendIO {
        pin: crate::pin::Pin::from_raw(0),
        source: "malformed w1_slave temperature".to_string(),
    })?;
    Ok(milli as f64 / 1000.0)
}

/// Draws `celsius = -10 + rand(0..30) + rand_unit()` for every known
/// thermometer name instead of reading real hardware.
pub struct SyntheticOneWireSource {
    persistence: Arc<Persistence>,
}

impl SyntheticOneWireSource {
    pub fn new(persistence: Arc<Persistence>) -> Self {
        Self { persistence }
    }
}

#[async_trait::async_trait]
impl OneWireSource for SyntheticOneWireSource {
    async fn enumerate(&self) -> Result<Vec<String>> {
        let thermometers = self.persistence.list_thermometers().await?;
        Ok(thermometers.into_iter().map(|t| t.sensor).collect())
    }

    async fn read_celsius(&self, _name: &str) -> Result<f64> {
        let mut rng = rand::rng();
        let base: f64 = rng.random_range(0..30) as f64;
        let fraction: f64 = rng.random();
        Ok(-10.0 + base + fraction)
    }
}

/// Periodically samples every bound thermometer, persists each reading, and
/// appends it to the in-memory ring buffer used for `Browse` decoration.
pub struct ThermalSampler {
    source: Arc<dyn OneWireSource>,
    persistence: Arc<Persistence>,
    blocks: Mutex<HashMap<i64, ThermalBlock>>,
    interval: Duration,
}

impl ThermalSampler {
    pub fn new(source: Arc<dyn OneWireSource>, persistence: Arc<Persistence>, interval: Duration) -> Self {
        Self {
            source,
            persistence,
            blocks: Mutex::new(HashMap::new()),
            interval,
        }
    }

    /// The most recent in-memory reading for a thermometer, if any sample has been taken.
    pub async fn last(&self, thermometer_id: i64) -> Option<ThermalPoint> {
        let blocks = self.blocks.lock().await;
        blocks.get(&thermometer_id).and_then(|b| b.last().ok())
    }

    /// Runs one sampling tick: enumerate, match to thermometer rows, read, record.
    pub async fn tick(&self, now: i64) -> Result<()> {
        let names = self.source.enumerate().await?;
        for name in names {
            let thermometer = match self.persistence.find_thermometer_by_sensor_like(&name).await? {
                Some(t) => t,
                None => {
                    debug!("thermal sampler: no thermometer bound to sensor '{name}', skipping");
                    continue;
                }
            };
            let celsius = match self.source.read_celsius(&name).await {
                Ok(c) => c,
                Err(e) => {
                    warn!("thermal sampler: read error for '{name}': {e}");
                    continue;
                }
            };
            self.persistence.insert_thermal_data(thermometer.id, celsius, now).await?;
            let mut blocks = self.blocks.lock().await;
            blocks
                .entry(thermometer.id)
                .or_insert_with(ThermalBlock::new)
                .add(ThermalPoint { celsius, timestamp: now });
        }
        Ok(())
    }

    /// Spawns the periodic sampling task. The returned handle runs until aborted.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                let now = chrono::Utc::now().timestamp();
                if let Err(e) = self.tick(now).await {
                    warn!("thermal sampler tick failed: {e}");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_reports_empty_before_any_sample() {
        let block = ThermalBlock::new();
        assert!(block.last().is_err());
        assert!(block.read().is_empty());
    }

    #[test]
    fn ring_buffer_last_and_read_before_wraparound() {
        let mut block = ThermalBlock::new();
        block.add(ThermalPoint { celsius: 1.0, timestamp: 1 });
        block.add(ThermalPoint { celsius: 2.0, timestamp: 2 });
        assert_eq!(block.last().unwrap().celsius, 2.0);
        let read: Vec<f64> = block.read().iter().map(|p| p.celsius).collect();
        assert_eq!(read, vec![1.0, 2.0]);
    }

    #[test]
    fn ring_buffer_wraps_and_overwrites_oldest() {
        let mut block = ThermalBlock::new();
        for i in 0..BLOCK_CAPACITY + 5 {
            block.add(ThermalPoint { celsius: i as f64, timestamp: i as i64 });
        }
        assert_eq!(block.len(), BLOCK_CAPACITY);
        let read = block.read();
        // oldest five samples (0..5) were overwritten; chronological order preserved
        assert_eq!(read.first().unwrap().celsius, 5.0);
        assert_eq!(read.last().unwrap().celsius, (BLOCK_CAPACITY + 4) as f64);
        assert_eq!(block.last().unwrap().celsius, (BLOCK_CAPACITY + 4) as f64);
    }

    #[test]
    fn parses_w1_slave_temperature() {
        let contents = "4d 01 4b 46 7f ff 0c 10 7f : crc=7f YES\n4d 01 4b 46 7f ff 0c 10 7f t=21437\n";
        assert_eq!(parse_w1_slave(contents).unwrap(), 21.437);
    }
}
