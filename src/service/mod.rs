// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Device Services: the application-level API a REST or CLI front end (out of
//! scope here) would call into. Each wraps the Persistence Facade and, where a
//! device has pins, the Pin Coordination Engine.

mod light;
mod sunblind;
mod thermometer;
mod user;

pub use light::LightService;
pub use sunblind::SunblindService;
pub use thermometer::ThermometerService;
pub use user::UserService;
