// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Transactional user display-order rewrite, shared by the light, sunblind,
//! and thermometer order tables — they share the exact `(id, userid,
//! targetid)` shape, so one implementation serves all three (the order table
//! name is always a crate-internal literal, never user input).

use sqlx::SqlitePool;

use crate::error::Result;

#[derive(sqlx::FromRow)]
struct OrderRow {
    order_id: i64,
    target_id: i64,
}

/// Runs the in-place rewrite described in §4.5: existing rows are updated in
/// place (keeping their `id`), new positions are appended, and any rows past
/// the new length are deleted. Commits in a single transaction.
pub async fn save_order(pool: &SqlitePool, order_table: &'static str, user_id: i64, new_ids: &[i64]) -> Result<()> {
    let mut tx = pool.begin().await?;

    let current: Vec<OrderRow> = sqlx::query_as(&format!(
        "SELECT id as order_id, targetid as target_id FROM {order_table} WHERE userid = ? ORDER BY id ASC"
    ))
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await?;

    let mut last_id = 0i64;
    for (i, target_id) in new_ids.iter().enumerate() {
        if let Some(current_row) = current.get(i) {
            if *target_id != current_row.target_id {
                sqlx::query(&format!("UPDATE {order_table} SET targetid = ? WHERE id = ?"))
                    .bind(target_id)
                    .bind(current_row.order_id)
                    .execute(&mut *tx)
                    .await?;
            }
            last_id = current_row.order_id;
        } else {
            sqlx::query(&format!("INSERT INTO {order_table} (userid, targetid) VALUES (?, ?)"))
                .bind(user_id)
                .bind(target_id)
                .execute(&mut *tx)
                .await?;
        }
    }
    if new_ids.len() < current.len() {
        sqlx::query(&format!("DELETE FROM {order_table} WHERE userid = ? AND id > ?"))
            .bind(user_id)
            .bind(last_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// The user's preferred `target_id` sequence, ascending by row id.
pub async fn load_order(pool: &SqlitePool, order_table: &'static str, user_id: i64) -> Result<Vec<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar(&format!(
        "SELECT targetid FROM {order_table} WHERE userid = ? ORDER BY id ASC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Reorders `items` (already in ascending-id order) per `order`: the
/// intersection first, in `order`'s sequence, then any remaining items in
/// their original order.
pub fn apply_order<T>(mut items: Vec<T>, order: &[i64], id_of: impl Fn(&T) -> i64) -> Vec<T> {
    let mut ordered = Vec::with_capacity(items.len());
    for target in order {
        if let Some(pos) = items.iter().position(|item| id_of(item) == *target) {
            ordered.push(items.remove(pos));
        }
    }
    ordered.extend(items);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_order_places_intersection_first_then_remainder() {
        let items = vec![3i64, 7, 9];
        let ordered = apply_order(items, &[9, 7], |id| *id);
        assert_eq!(ordered, vec![9, 7, 3]);
    }

    #[test]
    fn apply_order_with_empty_preference_keeps_natural_order() {
        let items = vec![1i64, 2, 3];
        let ordered = apply_order(items, &[], |id| *id);
        assert_eq!(ordered, vec![1, 2, 3]);
    }
}
