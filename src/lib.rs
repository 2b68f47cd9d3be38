// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Home Automation Panel Controller
//!
//! A library for coordinating a home-automation panel: physical pushbutton
//! inputs paired with relay outputs (lights, sunblinds), periodic 1-wire
//! thermal sampling, and the SQLite-backed account and device store behind
//! them.
//!
//! ## Main Components
//!
//! - **Pin**: bit-exact addressing of expander and native-header GPIO lines
//! - **Backend**: the hardware boundary each addressed pin is read/written through
//! - **PCE**: the Pin Coordination Engine, sole owner of every open pin pair
//! - **Thermal**: the ring-buffer sampler behind 1-wire thermometers
//! - **Persistence**: the SQLite facade for lights, sunblinds, thermometers, users
//! - **Credential**: password hashing and bearer-token issuance/verification
//! - **Service**: the application-level API (Light/Sunblind/Thermometer/User)
//!
//! ## Usage
//!
//! This crate is consumed as a library by a front end (REST API, CLI, or
//! embedded UI) that is responsible for process bootstrap, configuration
//! loading, and request routing — all out of scope here. [`Panel::start`]
//! is the in-process wiring a front end calls into at startup.

/// Crate-wide error taxonomy every fallible operation returns.
pub mod error;

/// Bit-exact addressing of expander and native-header GPIO pins.
pub mod pin;

/// Low-level GPIO drivers: the hardware boundary the engine's workers read and write through.
pub mod backend;

/// The Pin Coordination Engine: registers input/output pairs and runs their polling workers.
pub mod pce;

/// Periodic 1-wire thermal sampling into fixed-capacity per-thermometer ring buffers.
pub mod thermal;

/// The SQLite persistence facade: schema, seeding, and CRUD plus transactional ordering.
pub mod persistence;

/// Password hashing and bearer-token issuance/verification.
pub mod credential;

/// Shared name/password validation rules.
pub mod validate;

/// The configuration shape a front end loads and passes to [`Panel::start`].
pub mod config;

/// Application-level services: Light, Sunblind, Thermometer, User.
pub mod service;

use std::sync::Arc;
use std::time::Duration;

use log::info;

use config::Config;
use error::Result;
use pce::Engine;
use persistence::Persistence;
use service::{LightService, SunblindService, ThermometerService, UserService};
use thermal::{SyntheticOneWireSource, SysfsOneWireSource, ThermalSampler};

/// The fully wired system: persistence, the pin engine, the thermal sampler,
/// and the four device services built on top of them. A front end constructs
/// one of these at startup and holds it for the process lifetime.
pub struct Panel {
    pub persistence: Arc<Persistence>,
    pub engine: Arc<Engine>,
    pub sampler: Arc<ThermalSampler>,
    pub lights: LightService,
    pub sunblinds: SunblindService,
    pub thermometers: ThermometerService,
    pub users: UserService,
    sampler_handle: tokio::task::JoinHandle<()>,
}

impl Panel {
    /// Opens the database, constructs the engine against real hardware
    /// backends, loads every persisted light and sunblind pair into it, and
    /// spawns the thermal sampler. Fails if the database cannot be opened or
    /// a persisted pair cannot be re-registered (a pin index outside the
    /// configured hardware's range, most commonly).
    pub async fn start(config: &Config) -> Result<Self> {
        let persistence = Arc::new(Persistence::connect(&config.database_file).await?);
        let engine = Arc::new(Engine::with_hardware());

        let lights = LightService::new(persistence.clone(), engine.clone());
        lights.load().await?;
        let sunblinds = SunblindService::new(persistence.clone(), engine.clone());
        sunblinds.load().await?;

        let source: Arc<dyn thermal::OneWireSource> = if config.generate_random_temperature {
            Arc::new(SyntheticOneWireSource::new(persistence.clone()))
        } else {
            Arc::new(SysfsOneWireSource::new("/sys/bus/w1/devices"))
        };
        let interval = Duration::from_millis(config.thermal_update_interval_ms.max(1));
        let sampler = Arc::new(ThermalSampler::new(source, persistence.clone(), interval));
        let sampler_handle = sampler.clone().spawn();

        let thermometers = ThermometerService::new(persistence.clone(), sampler.clone());
        let users = UserService::new(persistence.clone(), config.jwt_token.clone());

        info!("panel started");
        Ok(Self {
            persistence,
            engine,
            sampler,
            lights,
            sunblinds,
            thermometers,
            users,
            sampler_handle,
        })
    }

    /// Stops the thermal sampler and closes the engine, driving every output
    /// idle and releasing every backend handle.
    pub async fn stop(&self) -> Result<()> {
        self.sampler_handle.abort();
        self.engine.close().await
    }
}

pub use persistence::models;
