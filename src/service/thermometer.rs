// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Thermometer Device Service: CRUD over the persisted rows plus the
//! last-reading decoration `Browse` applies from the Thermal Sampler's
//! in-memory ring buffers.

use std::sync::Arc;

use log::info;

use crate::error::{PanelError, Result};
use crate::persistence::models::{ThermalData, Thermometer};
use crate::persistence::Persistence;
use crate::thermal::ThermalSampler;
use crate::validate::validate_name;

pub struct ThermometerService {
    persistence: Arc<Persistence>,
    sampler: Arc<ThermalSampler>,
}

impl ThermometerService {
    pub fn new(persistence: Arc<Persistence>, sampler: Arc<ThermalSampler>) -> Self {
        Self { persistence, sampler }
    }

    pub async fn create(&self, name: &str, sensor: &str) -> Result<i64> {
        let name = validate_name(name)?;
        if sensor.trim().is_empty() {
            return Err(PanelError::InvalidInput { reason: "sensor address must not be empty".to_string() });
        }
        let id = self.persistence.insert_thermometer(&name, sensor).await?;
        info!("created thermometer '{id}' with name {name}");
        Ok(id)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.persistence.delete_thermometer(id).await?;
        info!("deleted thermometer '{id}'");
        Ok(())
    }

    /// Each thermometer decorated with the rounded integer of its last
    /// in-memory reading, if the sampler has taken one.
    pub async fn browse(&self, user_id: i64) -> Result<Vec<(Thermometer, Option<i64>)>> {
        let thermometers = self.persistence.browse_thermometers(user_id).await?;
        let mut out = Vec::with_capacity(thermometers.len());
        for thermometer in thermometers {
            let last = self.sampler.last(thermometer.id).await.map(|p| p.celsius.round() as i64);
            out.push((thermometer, last));
        }
        Ok(out)
    }

    pub async fn get_data(&self, id: i64, from: i64, to: i64) -> Result<Vec<ThermalData>> {
        self.persistence.get_thermal_data(id, from, to).await
    }

    pub async fn save_order(&self, user_id: i64, new_ids: &[i64]) -> Result<()> {
        self.persistence.save_thermometer_order(user_id, new_ids).await
    }
}
