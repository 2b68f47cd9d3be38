// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Row types for the relational store (§6).

use crate::pin::Pin;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Light {
    pub id: i64,
    pub name: String,
    pub input_pin: Pin,
    pub output_pin: Pin,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Sunblind {
    pub id: i64,
    pub name: String,
    pub input_down_pin: Pin,
    pub input_up_pin: Pin,
    pub output_down_pin: Pin,
    pub output_up_pin: Pin,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Thermometer {
    pub id: i64,
    pub name: String,
    pub sensor: String,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ThermalData {
    pub id: i64,
    pub thermometer_id: i64,
    pub celsius: f64,
    pub timestamp: i64,
}

/// Access level, ordered by privilege. `None` is not a valid role to assign a
/// user: it only appears transiently during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[repr(i64)]
pub enum Role {
    None = 0,
    Guest = 1,
    User = 2,
    Admin = 3,
}

impl Role {
    pub fn from_i64(value: i64) -> Self {
        match value {
            1 => Role::Guest,
            2 => Role::User,
            3 => Role::Admin,
            _ => Role::None,
        }
    }

    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub salt: Option<String>,
    pub role: Role,
}
