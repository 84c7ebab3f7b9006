// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Key/value settings store.

use rusqlite::{params, Connection, OptionalExtension};

use pressd_core::error::PressdError;

use crate::store::db_err;

pub fn get(conn: &Connection, key: &str) -> Result<Option<String>, PressdError> {
    conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        params![key],
        |r| r.get(0),
    )
    .optional()
    .map_err(db_err)
}

pub fn get_bool(conn: &Connection, key: &str, default: bool) -> Result<bool, PressdError> {
    Ok(match get(conn, key)? {
        Some(v) => matches!(v.as_str(), "1" | "true" | "yes"),
        None => default,
    })
}

pub fn set(conn: &Connection, key: &str, value: &str) -> Result<(), PressdError> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )
    .map_err(db_err)?;
    Ok(())
}

pub fn remove(conn: &Connection, key: &str) -> Result<(), PressdError> {
    conn.execute("DELETE FROM settings WHERE key = ?1", params![key])
        .map_err(db_err)?;
    Ok(())
}

/// Parse a comma-separated user-list setting (`printer.<id>.allowed_users`
/// / `.denied_users`) into individual usernames.
pub fn get_user_list(conn: &Connection, key: &str) -> Result<Vec<String>, PressdError> {
    Ok(get(conn, key)?
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[test]
    fn set_then_get_round_trips() {
        let store = Store::open_in_memory().unwrap();
        store.with_tx(|tx| set(tx, "_user_cancel_any", "true")).unwrap();
        let v = store.with_tx_read(|tx| get_bool(tx, "_user_cancel_any", false)).unwrap();
        assert!(v);
    }

    #[test]
    fn missing_key_uses_default() {
        let store = Store::open_in_memory().unwrap();
        let v = store.with_tx_read(|tx| get_bool(tx, "_missing", true)).unwrap();
        assert!(v);
    }

    #[test]
    fn user_list_parses_comma_separated() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_tx(|tx| set(tx, "printer.p1.denied_users", "bob, carol"))
            .unwrap();
        let list = store
            .with_tx_read(|tx| get_user_list(tx, "printer.p1.denied_users"))
            .unwrap();
        assert_eq!(list, vec!["bob".to_string(), "carol".to_string()]);
    }
}
