// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sunblind Device Service. Each persisted sunblind registers **two**
//! independent Timed pairs with the engine — one per axis — per spec.md §3.
//! A draft in the original source registered the down axis as Toggle and the
//! up axis as Timed; that draft is superseded here, both axes are Timed.

use std::sync::Arc;

use log::info;

use crate::error::Result;
use crate::pce::{Behaviour, Engine};
use crate::persistence::models::Sunblind;
use crate::persistence::Persistence;
use crate::pin::Pin;
use crate::validate::validate_name;

pub struct SunblindService {
    persistence: Arc<Persistence>,
    engine: Arc<Engine>,
}

impl SunblindService {
    pub fn new(persistence: Arc<Persistence>, engine: Arc<Engine>) -> Self {
        Self { persistence, engine }
    }

    pub async fn load(&self) -> Result<()> {
        for sunblind in self.persistence.list_sunblinds().await? {
            self.register_axes(&sunblind).await?;
        }
        Ok(())
    }

    async fn register_axes(&self, sunblind: &Sunblind) -> Result<()> {
        self.engine
            .register_pair(sunblind.input_down_pin, sunblind.output_down_pin, Behaviour::Timed)
            .await?;
        self.engine
            .register_pair(sunblind.input_up_pin, sunblind.output_up_pin, Behaviour::Timed)
            .await?;
        Ok(())
    }

    async fn unregister_axes(&self, sunblind: &Sunblind) -> Result<()> {
        self.engine.unregister_pair(sunblind.input_down_pin, sunblind.output_down_pin).await?;
        self.engine.unregister_pair(sunblind.input_up_pin, sunblind.output_up_pin).await?;
        Ok(())
    }

    pub async fn create(
        &self,
        name: &str,
        input_down: Pin,
        input_up: Pin,
        output_down: Pin,
        output_up: Pin,
    ) -> Result<i64> {
        let name = validate_name(name)?;
        self.engine.is_registered(&[input_down, input_up, output_down, output_up]).await?;

        let id = self.persistence.insert_sunblind(&name, input_down, input_up, output_down, output_up).await?;
        self.engine.register_pair(input_down, output_down, Behaviour::Timed).await?;
        self.engine.register_pair(input_up, output_up, Behaviour::Timed).await?;

        info!("created sunblind '{id}' with name {name}");
        Ok(id)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let current = self.persistence.get_sunblind(id).await?;
        self.persistence.delete_sunblind(id).await?;
        self.unregister_axes(&current).await?;
        info!("deleted sunblind '{id}'");
        Ok(())
    }

    /// Pulses the down axis for `TIMED_PIN_TIME`.
    pub async fn toggle_down(&self, id: i64) -> Result<bool> {
        let sunblind = self.persistence.get_sunblind(id).await?;
        self.engine.toggle_pin(sunblind.input_down_pin).await?;
        self.engine.get_pin_state(sunblind.input_down_pin).await
    }

    /// Pulses the up axis for `TIMED_PIN_TIME`.
    pub async fn toggle_up(&self, id: i64) -> Result<bool> {
        let sunblind = self.persistence.get_sunblind(id).await?;
        self.engine.toggle_pin(sunblind.input_up_pin).await?;
        self.engine.get_pin_state(sunblind.input_up_pin).await
    }

    pub async fn browse(&self, user_id: i64) -> Result<Vec<Sunblind>> {
        self.persistence.browse_sunblinds(user_id).await
    }

    pub async fn save_order(&self, user_id: i64, new_ids: &[i64]) -> Result<()> {
        self.persistence.save_sunblind_order(user_id, new_ids).await
    }
}
