// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Light Device Service: wires Persistence + PCE together, preserving the
//! invariant that every persisted light has exactly one registered Toggle pair.

use std::sync::Arc;

use log::info;

use crate::error::Result;
use crate::pce::{Behaviour, Engine};
use crate::persistence::models::Light;
use crate::persistence::Persistence;
use crate::pin::Pin;
use crate::validate::validate_name;

pub struct LightService {
    persistence: Arc<Persistence>,
    engine: Arc<Engine>,
}

impl LightService {
    pub fn new(persistence: Arc<Persistence>, engine: Arc<Engine>) -> Self {
        Self { persistence, engine }
    }

    /// Registers every persisted light's pair with the engine. Call once at
    /// startup, after the engine is constructed and before serving requests.
    pub async fn load(&self) -> Result<()> {
        for light in self.persistence.list_lights().await? {
            self.engine.register_pair(light.input_pin, light.output_pin, Behaviour::Toggle).await?;
        }
        Ok(())
    }

    pub async fn create(&self, name: &str, input_pin: Pin, output_pin: Pin) -> Result<i64> {
        let name = validate_name(name)?;
        self.engine.is_registered(&[input_pin, output_pin]).await?;

        let id = self.persistence.insert_light(&name, input_pin, output_pin).await?;
        self.engine.register_pair(input_pin, output_pin, Behaviour::Toggle).await?;

        info!("created light '{id}' with name {name}");
        Ok(id)
    }

    pub async fn update(&self, id: i64, name: &str, input_pin: Pin, output_pin: Pin) -> Result<()> {
        let name = validate_name(name)?;
        let current = self.persistence.get_light(id).await?;

        let new_pins: Vec<Pin> = [input_pin, output_pin]
            .into_iter()
            .filter(|p| *p != current.input_pin && *p != current.output_pin)
            .collect();
        if !new_pins.is_empty() {
            self.engine.is_registered(&new_pins).await?;
        }

        self.persistence.update_light(id, &name, input_pin, output_pin).await?;

        if !new_pins.is_empty() {
            self.engine.unregister_pair(current.input_pin, current.output_pin).await?;
            self.engine.register_pair(input_pin, output_pin, Behaviour::Toggle).await?;
        }

        info!("updated light '{id}'");
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let current = self.persistence.get_light(id).await?;
        self.persistence.delete_light(id).await?;
        self.engine.unregister_pair(current.input_pin, current.output_pin).await?;
        info!("deleted light '{id}'");
        Ok(())
    }

    /// Toggles the light and returns its resulting `output_desired` state.
    pub async fn toggle(&self, id: i64) -> Result<bool> {
        let light = self.persistence.get_light(id).await?;
        self.engine.toggle_pin(light.input_pin).await?;
        self.engine.get_pin_state(light.input_pin).await
    }

    pub async fn browse(&self, user_id: i64) -> Result<Vec<(Light, bool)>> {
        let lights = self.persistence.browse_lights(user_id).await?;
        let mut out = Vec::with_capacity(lights.len());
        for light in lights {
            let state = self.engine.get_pin_state(light.input_pin).await.unwrap_or(true);
            out.push((light, state));
        }
        Ok(out)
    }

    pub async fn save_order(&self, user_id: i64, new_ids: &[i64]) -> Result<()> {
        self.persistence.save_light_order(user_id, new_ids).await
    }
}
