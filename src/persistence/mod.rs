// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! The Persistence Facade: narrow CRUD plus the transactional ordering
//! operations over the SQLite store. Every call acquires and releases a
//! pooled connection; nothing here holds a connection across calls.

pub mod models;
mod order;

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::{map_insert_error, Result};
use crate::pin::Pin;
use models::{Light, Role, Sunblind, ThermalData, Thermometer, User};

const LIGHT_ORDER_TABLE: &str = "lightorder";
const SUNBLIND_ORDER_TABLE: &str = "sunblindorder";
const THERMOMETER_ORDER_TABLE: &str = "thermometerorder";

pub struct Persistence {
    pool: SqlitePool,
}

impl Persistence {
    /// Opens (creating if absent) the SQLite database at `database_file`,
    /// enables foreign keys on every pooled connection, creates the schema if
    /// missing, and seeds the default admin/sample rows on first init.
    pub async fn connect(database_file: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", database_file.display()))?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await?;
        let persistence = Self { pool };
        persistence.create_schema().await?;
        persistence.seed_if_empty().await?;
        Ok(persistence)
    }

    async fn create_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS user (
                id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                password TEXT NOT NULL,
                salt TEXT,
                role INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS thermometer (
                id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL,
                sensor TEXT UNIQUE NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS thermaldata (
                id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                thermometerid INTEGER NOT NULL REFERENCES thermometer(id) ON DELETE CASCADE,
                celsius REAL NOT NULL,
                timestamp INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS light (
                id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL,
                inputpin INTEGER NOT NULL,
                outputpin INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sunblind (
                id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL,
                inputdownpin INTEGER NOT NULL,
                inputuppin INTEGER NOT NULL,
                outputdownpin INTEGER NOT NULL,
                outputuppin INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        for table in [LIGHT_ORDER_TABLE, SUNBLIND_ORDER_TABLE, THERMOMETER_ORDER_TABLE] {
            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                    userid INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
                    targetid INTEGER NOT NULL
                )"
            ))
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn seed_if_empty(&self) -> Result<()> {
        let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user").fetch_one(&self.pool).await?;
        if user_count > 0 {
            log::info!("database already initialised");
            return Ok(());
        }

        sqlx::query("INSERT INTO user (username, password, salt, role) VALUES (?, ?, NULL, ?)")
            .bind("admin")
            .bind("admin1")
            .bind(Role::Admin.as_i64())
            .execute(&self.pool)
            .await?;

        sqlx::query("INSERT INTO thermometer (name, sensor) VALUES (?, ?)")
            .bind("sample")
            .bind("28-000000000000")
            .execute(&self.pool)
            .await?;

        let input_down = Pin::make_expander_pin(0, 0).unwrap().raw() as i64;
        let input_up = Pin::make_expander_pin(0, 1).unwrap().raw() as i64;
        let output_down = Pin::make_expander_pin(0, 2).unwrap().raw() as i64;
        let output_up = Pin::make_expander_pin(0, 3).unwrap().raw() as i64;
        sqlx::query(
            "INSERT INTO sunblind (name, inputdownpin, inputuppin, outputdownpin, outputuppin) VALUES (?, ?, ?, ?, ?)",
        )
        .bind("sample")
        .bind(input_down)
        .bind(input_up)
        .bind(output_down)
        .bind(output_up)
        .execute(&self.pool)
        .await?;

        log::info!("initialised database with seed rows");
        Ok(())
    }

    // ---- Light ----

    pub async fn list_lights(&self) -> Result<Vec<Light>> {
        let rows: Vec<(i64, String, i64, i64)> =
            sqlx::query_as("SELECT id, name, inputpin, outputpin FROM light ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name, input_pin, output_pin)| Light {
                id,
                name,
                input_pin: Pin::from_raw(input_pin as u8),
                output_pin: Pin::from_raw(output_pin as u8),
            })
            .collect())
    }

    pub async fn get_light(&self, id: i64) -> Result<Light> {
        let row: Option<(i64, String, i64, i64)> =
            sqlx::query_as("SELECT id, name, inputpin, outputpin FROM light WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        let (id, name, input_pin, output_pin) =
            row.ok_or(crate::error::PanelError::NotFound { what: "light", id })?;
        Ok(Light {
            id,
            name,
            input_pin: Pin::from_raw(input_pin as u8),
            output_pin: Pin::from_raw(output_pin as u8),
        })
    }

    pub async fn insert_light(&self, name: &str, input_pin: Pin, output_pin: Pin) -> Result<i64> {
        let result = sqlx::query("INSERT INTO light (name, inputpin, outputpin) VALUES (?, ?, ?)")
            .bind(name)
            .bind(input_pin.raw() as i64)
            .bind(output_pin.raw() as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_error("light", e))?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update_light(&self, id: i64, name: &str, input_pin: Pin, output_pin: Pin) -> Result<()> {
        sqlx::query("UPDATE light SET name = ?, inputpin = ?, outputpin = ? WHERE id = ?")
            .bind(name)
            .bind(input_pin.raw() as i64)
            .bind(output_pin.raw() as i64)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_light(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM light WHERE id = ?").bind(id).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn browse_lights(&self, user_id: i64) -> Result<Vec<Light>> {
        let lights = self.list_lights().await?;
        let order = order::load_order(&self.pool, LIGHT_ORDER_TABLE, user_id).await?;
        Ok(order::apply_order(lights, &order, |l| l.id))
    }

    pub async fn save_light_order(&self, user_id: i64, new_ids: &[i64]) -> Result<()> {
        order::save_order(&self.pool, LIGHT_ORDER_TABLE, user_id, new_ids).await
    }

    // ---- Sunblind ----

    pub async fn list_sunblinds(&self) -> Result<Vec<Sunblind>> {
        let rows: Vec<(i64, String, i64, i64, i64, i64)> = sqlx::query_as(
            "SELECT id, name, inputdownpin, inputuppin, outputdownpin, outputuppin FROM sunblind ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name, idp, iup, odp, oup)| Sunblind {
                id,
                name,
                input_down_pin: Pin::from_raw(idp as u8),
                input_up_pin: Pin::from_raw(iup as u8),
                output_down_pin: Pin::from_raw(odp as u8),
                output_up_pin: Pin::from_raw(oup as u8),
            })
            .collect())
    }

    pub async fn get_sunblind(&self, id: i64) -> Result<Sunblind> {
        let row: Option<(i64, String, i64, i64, i64, i64)> = sqlx::query_as(
            "SELECT id, name, inputdownpin, inputuppin, outputdownpin, outputuppin FROM sunblind WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        let (id, name, idp, iup, odp, oup) =
            row.ok_or(crate::error::PanelError::NotFound { what: "sunblind", id })?;
        Ok(Sunblind {
            id,
            name,
            input_down_pin: Pin::from_raw(idp as u8),
            input_up_pin: Pin::from_raw(iup as u8),
            output_down_pin: Pin::from_raw(odp as u8),
            output_up_pin: Pin::from_raw(oup as u8),
        })
    }

    pub async fn insert_sunblind(
        &self,
        name: &str,
        input_down: Pin,
        input_up: Pin,
        output_down: Pin,
        output_up: Pin,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO sunblind (name, inputdownpin, inputuppin, outputdownpin, outputuppin) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(input_down.raw() as i64)
        .bind(input_up.raw() as i64)
        .bind(output_down.raw() as i64)
        .bind(output_up.raw() as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error("sunblind", e))?;
        Ok(result.last_insert_rowid())
    }

    pub async fn delete_sunblind(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM sunblind WHERE id = ?").bind(id).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn browse_sunblinds(&self, user_id: i64) -> Result<Vec<Sunblind>> {
        let sunblinds = self.list_sunblinds().await?;
        let order = order::load_order(&self.pool, SUNBLIND_ORDER_TABLE, user_id).await?;
        Ok(order::apply_order(sunblinds, &order, |s| s.id))
    }

    pub async fn save_sunblind_order(&self, user_id: i64, new_ids: &[i64]) -> Result<()> {
        order::save_order(&self.pool, SUNBLIND_ORDER_TABLE, user_id, new_ids).await
    }

    // ---- Thermometer / ThermalData ----

    pub async fn list_thermometers(&self) -> Result<Vec<Thermometer>> {
        let rows: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT id, name, sensor FROM thermometer ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name, sensor)| Thermometer { id, name, sensor })
            .collect())
    }

    pub async fn find_thermometer_by_sensor_like(&self, pattern: &str) -> Result<Option<Thermometer>> {
        let row: Option<(i64, String, String)> =
            sqlx::query_as("SELECT id, name, sensor FROM thermometer WHERE sensor LIKE ?")
                .bind(pattern)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, name, sensor)| Thermometer { id, name, sensor }))
    }

    pub async fn insert_thermometer(&self, name: &str, sensor: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO thermometer (name, sensor) VALUES (?, ?)")
            .bind(name)
            .bind(sensor)
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_error("thermometer", e))?;
        Ok(result.last_insert_rowid())
    }

    pub async fn delete_thermometer(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM thermometer WHERE id = ?").bind(id).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn browse_thermometers(&self, user_id: i64) -> Result<Vec<Thermometer>> {
        let thermometers = self.list_thermometers().await?;
        let order = order::load_order(&self.pool, THERMOMETER_ORDER_TABLE, user_id).await?;
        Ok(order::apply_order(thermometers, &order, |t| t.id))
    }

    pub async fn save_thermometer_order(&self, user_id: i64, new_ids: &[i64]) -> Result<()> {
        order::save_order(&self.pool, THERMOMETER_ORDER_TABLE, user_id, new_ids).await
    }

    pub async fn insert_thermal_data(&self, thermometer_id: i64, celsius: f64, timestamp: i64) -> Result<()> {
        sqlx::query("INSERT INTO thermaldata (thermometerid, celsius, timestamp) VALUES (?, ?, ?)")
            .bind(thermometer_id)
            .bind(celsius)
            .bind(timestamp)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_thermal_data(&self, thermometer_id: i64, from: i64, to: i64) -> Result<Vec<ThermalData>> {
        let rows: Vec<(i64, i64, f64, i64)> = sqlx::query_as(
            "SELECT id, thermometerid, celsius, timestamp FROM thermaldata \
             WHERE thermometerid = ? AND timestamp >= ? AND timestamp <= ? ORDER BY timestamp ASC",
        )
        .bind(thermometer_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, thermometer_id, celsius, timestamp)| ThermalData { id, thermometer_id, celsius, timestamp })
            .collect())
    }

    // ---- User ----

    pub async fn find_user_by_username_like(&self, pattern: &str) -> Result<Option<User>> {
        let row: Option<(i64, String, String, Option<String>, i64)> =
            sqlx::query_as("SELECT id, username, password, salt, role FROM user WHERE username LIKE ?")
                .bind(pattern)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, username, password, salt, role)| User {
            id,
            username,
            password,
            salt,
            role: Role::from_i64(role),
        }))
    }

    pub async fn get_user(&self, id: i64) -> Result<User> {
        let row: Option<(i64, String, String, Option<String>, i64)> =
            sqlx::query_as("SELECT id, username, password, salt, role FROM user WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        let (id, username, password, salt, role) =
            row.ok_or(crate::error::PanelError::NotFound { what: "user", id })?;
        Ok(User { id, username, password, salt, role: Role::from_i64(role) })
    }

    pub async fn insert_user(&self, username: &str, password_hash: &str, salt: &str, role: Role) -> Result<i64> {
        let result = sqlx::query("INSERT INTO user (username, password, salt, role) VALUES (?, ?, ?, ?)")
            .bind(username)
            .bind(password_hash)
            .bind(salt)
            .bind(role.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_error("user", e))?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update_user_role(&self, id: i64, role: Role) -> Result<()> {
        sqlx::query("UPDATE user SET role = ? WHERE id = ?")
            .bind(role.as_i64())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Updates the stored password hash. When `salt` is `Some`, also replaces
    /// the stored salt — used to migrate a legacy no-salt row to a salted one
    /// on its first password change.
    pub async fn update_user_password(&self, id: i64, password_hash: &str, salt: Option<&str>) -> Result<()> {
        match salt {
            Some(salt) => {
                sqlx::query("UPDATE user SET password = ?, salt = ? WHERE id = ?")
                    .bind(password_hash)
                    .bind(salt)
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
            }
            None => {
                sqlx::query("UPDATE user SET password = ? WHERE id = ?")
                    .bind(password_hash)
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn delete_user(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM user WHERE id = ?").bind(id).execute(&self.pool).await?;
        if result.rows_affected() < 1 {
            return Err(crate::error::PanelError::NotFound { what: "user", id });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Persistence {
        let file = tempfile::NamedTempFile::new().unwrap();
        Persistence::connect(file.path()).await.unwrap()
    }

    #[tokio::test]
    async fn seeds_default_admin_and_samples() {
        let db = test_db().await;
        let admin = db.find_user_by_username_like("admin").await.unwrap().unwrap();
        assert_eq!(admin.password, "admin1");
        assert!(admin.salt.is_none());
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(db.list_thermometers().await.unwrap().len(), 1);
        assert_eq!(db.list_sunblinds().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn light_crud_round_trips() {
        let db = test_db().await;
        let id = db
            .insert_light("kitchen", Pin::make_native_pin(0).unwrap(), Pin::make_native_pin(1).unwrap())
            .await
            .unwrap();
        let light = db.get_light(id).await.unwrap();
        assert_eq!(light.name, "kitchen");
        db.delete_light(id).await.unwrap();
        assert!(db.get_light(id).await.is_err());
    }

    #[tokio::test]
    async fn duplicate_light_name_surfaces_as_conflict() {
        let db = test_db().await;
        db.insert_light("kitchen", Pin::make_native_pin(0).unwrap(), Pin::make_native_pin(1).unwrap())
            .await
            .unwrap();
        let second = db.insert_light("kitchen", Pin::make_native_pin(2).unwrap(), Pin::make_native_pin(3).unwrap()).await;
        assert!(matches!(second, Err(crate::error::PanelError::Conflict { what: "light" })));
    }

    #[tokio::test]
    async fn order_round_trip_matches_spec_scenario() {
        let db = test_db().await;
        // seed has no lights yet; insert three with ids 1,2,3
        let a = db.insert_light("a", Pin::make_native_pin(0).unwrap(), Pin::make_native_pin(1).unwrap()).await.unwrap();
        let b = db.insert_light("b", Pin::make_native_pin(2).unwrap(), Pin::make_native_pin(3).unwrap()).await.unwrap();
        let c = db.insert_light("c", Pin::make_native_pin(4).unwrap(), Pin::make_native_pin(5).unwrap()).await.unwrap();
        let user_id = db.find_user_by_username_like("admin").await.unwrap().unwrap().id;

        db.save_light_order(user_id, &[c, a, b]).await.unwrap();
        let browsed = db.browse_lights(user_id).await.unwrap();
        assert_eq!(browsed.iter().map(|l| l.id).collect::<Vec<_>>(), vec![c, a, b]);

        db.save_light_order(user_id, &[b]).await.unwrap();
        let browsed = db.browse_lights(user_id).await.unwrap();
        assert_eq!(browsed.iter().map(|l| l.id).collect::<Vec<_>>(), vec![b, a, c]);
    }
}
