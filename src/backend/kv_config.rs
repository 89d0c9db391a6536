//! Generic KV configuration based on SurrealDB.
//!
//! This module provides a SurrealDB table called `settings` to store key-value pairs.
//!
//! The values are `key` and `value` pairs, where `key` is a string and `value` is a JSON object.

use crate::db::{Database, SETTINGS_TABLE};
use crate::error::Result;
use crate::validate::{validate_delay, validate_download_path};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KVConfig {
    pub key: String,
    pub value: Option<Value>,
}

impl KVConfig {
    pub fn new(key: String, value: Option<Value>) -> Self {
        Self { key, value }
    }

    pub async fn get(db: &Database, key: &str) -> Result<Option<Self>> {
        let q: Option<Self> = db.select((SETTINGS_TABLE, key)).await?;
        tracing::trace!("Retrieved value for key {}: {:?}", key, q);

        if q.is_none() {
            tracing::debug!("Key {} not found in KVConfig", key);
        }
        Ok(q)
    }

    pub async fn set(&mut self, db: &Database, value: Value) -> Result<()> {
        self.value = Some(value);
        let key = self.key.as_str();
        let q: Option<Self> = db.upsert((SETTINGS_TABLE, key)).content(self.clone()).await?;
        tracing::trace!("Set value for key {}: {:?}", key, q);
        Ok(())
    }
}

/// A trait for types that can be stored in the KV store.
pub trait KvOptExt: Serialize + DeserializeOwned + Clone + Default + std::fmt::Debug {
    /// Returns the key name for this configuration item.
    const KEY_NAME: &'static str;

    /// Serializes the implementing struct and saves it under `KEY_NAME`.
    async fn save(&self, db: &Database) -> Result<()> {
        let value = serde_json::to_value(self)?;
        let mut kv_config = KVConfig::new(Self::KEY_NAME.to_string(), None);
        kv_config.set(db, value).await
    }

    /// Retrieves the value stored under `KEY_NAME`.
    ///
    /// A missing or unreadable entry is replaced by `Default::default()`, which is
    /// saved before being returned so later readers see the same value.
    async fn load(db: &Database) -> Result<Self> {
        let key = Self::KEY_NAME;

        match KVConfig::get(db, key).await? {
            Some(KVConfig {
                value: Some(value), ..
            }) => match serde_json::from_value::<Self>(value.clone()) {
                Ok(deserialized) => {
                    tracing::trace!("Deserialized value for key '{}': {:?}", key, deserialized);
                    return Ok(deserialized);
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to deserialize value {:?} for key '{}': {}. Falling back to default.",
                        value,
                        key,
                        e
                    );
                }
            },
            Some(KVConfig { value: None, .. }) => {
                tracing::warn!(
                    "KVConfig found for key '{}' but its value is None. Falling back to default.",
                    key
                );
            }
            None => {
                tracing::debug!("Key '{}' not found in KVConfig. Using default.", key);
            }
        }

        let default_value = Self::default();
        tracing::info!("Saving default value for key '{}'", key);
        default_value.save(db).await?;
        Ok(default_value)
    }
}

pub const DEFAULT_DOWNLOAD_PATH: &str = "/app/Volume/Download";
pub const DEFAULT_DELAY_SECONDS: u64 = 120;

/// Runtime downloader settings, editable through `POST /api/config`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloaderSettings {
    pub download_path: String,
    pub delay_seconds: u64,
}

impl Default for DownloaderSettings {
    fn default() -> Self {
        Self {
            download_path: DEFAULT_DOWNLOAD_PATH.to_string(),
            delay_seconds: DEFAULT_DELAY_SECONDS,
        }
    }
}

impl KvOptExt for DownloaderSettings {
    const KEY_NAME: &'static str = "downloader";
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_seconds: Option<u64>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.download_path.is_none() && self.delay_seconds.is_none()
    }
}

impl DownloaderSettings {
    /// Validate the whole patch first so a bad field leaves nothing half-applied.
    pub fn apply(&mut self, patch: &SettingsPatch) -> Result<()> {
        let download_path = patch
            .download_path
            .as_deref()
            .map(validate_download_path)
            .transpose()?;
        let delay_seconds = patch.delay_seconds.map(validate_delay).transpose()?;

        if let Some(path) = download_path {
            self.download_path = path;
        }
        if let Some(delay) = delay_seconds {
            self.delay_seconds = delay;
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(db))]
    pub async fn update(db: &Database, patch: &SettingsPatch) -> Result<Self> {
        let mut settings = Self::load(db).await?;
        settings.apply(patch)?;
        settings.save(db).await?;
        tracing::info!(
            download_path = %settings.download_path,
            delay_seconds = settings.delay_seconds,
            "Downloader settings updated"
        );
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::error::Error;
    use crate::validate::ValidationError;

    #[tokio::test]
    async fn load_materialises_defaults() {
        let db = db::memory().await;
        assert!(KVConfig::get(&db, "downloader").await.unwrap().is_none());

        let settings = DownloaderSettings::load(&db).await.unwrap();
        assert_eq!(settings, DownloaderSettings::default());
        assert_eq!(settings.delay_seconds, 120);

        let stored = KVConfig::get(&db, "downloader").await.unwrap().unwrap();
        assert_eq!(
            stored.value,
            Some(serde_json::json!({
                "download_path": "/app/Volume/Download",
                "delay_seconds": 120
            }))
        );
    }

    #[tokio::test]
    async fn unreadable_value_falls_back_to_default() {
        let db = db::memory().await;
        let mut kv = KVConfig::new("downloader".to_string(), None);
        kv.set(&db, serde_json::json!({"delay_seconds": "soon"}))
            .await
            .unwrap();

        let settings = DownloaderSettings::load(&db).await.unwrap();
        assert_eq!(settings, DownloaderSettings::default());
    }

    #[tokio::test]
    async fn update_is_partial() {
        let db = db::memory().await;
        DownloaderSettings::update(
            &db,
            &SettingsPatch {
                delay_seconds: Some(45),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let settings = DownloaderSettings::update(
            &db,
            &SettingsPatch {
                download_path: Some(" /data/xhs ".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(settings.download_path, "/data/xhs");
        assert_eq!(settings.delay_seconds, 45);
        assert_eq!(DownloaderSettings::load(&db).await.unwrap(), settings);
    }

    #[tokio::test]
    async fn invalid_patch_changes_nothing() {
        let db = db::memory().await;
        let err = DownloaderSettings::update(
            &db,
            &SettingsPatch {
                download_path: Some("/elsewhere".into()),
                delay_seconds: Some(10),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::DelayTooShort(10))
        ));
        assert_eq!(
            DownloaderSettings::load(&db).await.unwrap(),
            DownloaderSettings::default()
        );
    }
}
