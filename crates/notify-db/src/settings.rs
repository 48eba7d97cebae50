//! Typed settings accessors.
//!
//! Raw values are stored as strings; list- and map-valued keys are JSON.
//! Malformed JSON falls back to the empty value with a warning rather
//! than failing the caller.

use std::collections::HashMap;

use crate::{DbError, SettingsDb, keys};

impl SettingsDb {
    pub fn get_setting(&self, key: &str) -> Result<Option<String>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
            let value = stmt
                .query_row([key], |row| row.get::<_, String>(0))
                .optional()?;
            Ok(value)
        })
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
                 ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = CURRENT_TIMESTAMP",
                rusqlite::params![key, value],
            )?;
            Ok(())
        })?;
        self.notify_changed(key);
        Ok(())
    }

    pub fn get_all_settings(&self) -> Result<HashMap<String, String>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut map = HashMap::new();
            for row in rows {
                let (k, v) = row?;
                map.insert(k, v);
            }
            Ok(map)
        })
    }

    /// Seed a key with a default value if it has never been written.
    ///
    /// Does not publish a change event.
    pub fn seed_default(&self, key: &str, value: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )?;
            Ok(())
        })
    }

    pub fn is_enabled(&self) -> Result<bool, DbError> {
        self.get_bool(keys::ENABLED)
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<(), DbError> {
        self.set_setting(keys::ENABLED, if enabled { "true" } else { "false" })
    }

    pub fn emit_signals(&self) -> Result<bool, DbError> {
        self.get_bool(keys::EMIT_SIGNALS)
    }

    /// Enabled advanced-filter names, in user order.
    pub fn enabled_filters(&self) -> Result<Vec<String>, DbError> {
        self.get_string_list(keys::ENABLED_FILTERS)
    }

    pub fn set_enabled_filters(&self, names: &[String]) -> Result<(), DbError> {
        let json = serde_json::to_string(names).unwrap_or_else(|_| "[]".into());
        self.set_setting(keys::ENABLED_FILTERS, &json)
    }

    /// Enabled processor names for the topic tier.
    pub fn enabled_services(&self) -> Result<Vec<String>, DbError> {
        self.get_string_list(keys::ENABLED_SERVICES)
    }

    pub fn set_enabled_services(&self, names: &[String]) -> Result<(), DbError> {
        let json = serde_json::to_string(names).unwrap_or_else(|_| "[]".into());
        self.set_setting(keys::ENABLED_SERVICES, &json)
    }

    /// Free-text per-filter settings keyed by filter name.
    pub fn filter_settings(&self) -> Result<HashMap<String, String>, DbError> {
        let Some(raw) = self.get_setting(keys::FILTER_SETTINGS)? else {
            return Ok(HashMap::new());
        };
        match serde_json::from_str(&raw) {
            Ok(map) => Ok(map),
            Err(e) => {
                tracing::warn!(error = %e, key = keys::FILTER_SETTINGS,
                    "Malformed settings JSON, falling back to empty map");
                Ok(HashMap::new())
            }
        }
    }

    pub fn set_filter_setting(&self, name: &str, value: &str) -> Result<(), DbError> {
        let mut map = self.filter_settings()?;
        map.insert(name.to_string(), value.to_string());
        let json = serde_json::to_string(&map).unwrap_or_else(|_| "{}".into());
        self.set_setting(keys::FILTER_SETTINGS, &json)
    }

    fn get_bool(&self, key: &str) -> Result<bool, DbError> {
        Ok(self
            .get_setting(key)?
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false))
    }

    fn get_string_list(&self, key: &str) -> Result<Vec<String>, DbError> {
        let Some(raw) = self.get_setting(key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(list) => Ok(list),
            Err(e) => {
                tracing::warn!(error = %e, key,
                    "Malformed settings JSON, falling back to empty list");
                Ok(Vec::new())
            }
        }
    }
}

trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
