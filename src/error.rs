// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Crate-wide error taxonomy.
//!
//! One variant per error kind the panel's components can raise. Variants carry
//! enough context (pin value, row id, name) to log usefully without a second
//! allocation at the call site.

use sqlx::error::DatabaseError;
use thiserror::Error;

use crate::pin::Pin;

/// The single error type returned by every fallible operation in this crate.
#[derive(Debug, Error)]
pub enum PanelError {
    /// A pin index fell outside the expander or native partition.
    #[error("pin index {value} is out of range")]
    OutOfRange { value: u16 },

    /// A pin is already the input or output of a registered pair.
    #[error("pin {pin} is already in use")]
    InUse { pin: Pin },

    /// The engine (or a collaborator) was closed and can no longer accept work.
    #[error("component is no longer active")]
    Inactive,

    /// A database row was expected but absent.
    #[error("{what} '{id}' does not exist")]
    NotFound { what: &'static str, id: i64 },

    /// User-supplied data failed validation (name length, role, password).
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Login failed — wrong password or unknown username, indistinguishable to the caller.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A hardware backend read or write failed.
    #[error("pin {pin} backend error: {source}")]
    BackendIO { pin: Pin, source: String },

    /// A database operation failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// A unique constraint was violated (duplicate name, sensor address, etc).
    #[error("{what} already exists")]
    Conflict { what: &'static str },

    /// Token signing or decoding failed at the `jsonwebtoken` layer.
    #[error("token error: {0}")]
    TokenError(#[from] jsonwebtoken::errors::Error),
}

/// Maps a unique-constraint violation to [`PanelError::Conflict`], passing
/// every other `sqlx::Error` through as [`PanelError::Persistence`].
pub(crate) fn map_insert_error(what: &'static str, err: sqlx::Error) -> PanelError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => PanelError::Conflict { what },
        _ => PanelError::Persistence(err),
    }
}

pub type Result<T> = std::result::Result<T, PanelError>;
