//! Display preferences persisted in local storage.

use std::sync::Arc;

use tokio::sync::watch;

use forum_core::domain::{SettingsPatch, UiSettings};
use forum_core::ports::LocalStorage;

/// Local storage key of the settings record.
pub const SETTINGS_KEY: &str = "uiSettings";

pub struct UiSettingsStore {
    storage: Arc<dyn LocalStorage>,
    current: watch::Sender<UiSettings>,
}

impl UiSettingsStore {
    /// Read the persisted record over the defaults. A missing or unreadable
    /// record leaves the defaults in place.
    pub fn load(storage: Arc<dyn LocalStorage>) -> Self {
        let settings = match storage.get_item(SETTINGS_KEY) {
            Ok(Some(raw)) => UiSettings::from_persisted(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring corrupt UI settings");
                UiSettings::default()
            }),
            Ok(None) => UiSettings::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read UI settings");
                UiSettings::default()
            }
        };

        let (current, _) = watch::channel(settings);
        Self { storage, current }
    }

    pub fn current(&self) -> UiSettings {
        *self.current.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<UiSettings> {
        self.current.subscribe()
    }

    /// Merge `patch`, persist the whole record and notify subscribers.
    pub fn update(&self, patch: SettingsPatch) -> UiSettings {
        let mut next = self.current();
        next.apply(patch);

        match serde_json::to_string(&next) {
            Ok(raw) => {
                if let Err(e) = self.storage.set_item(SETTINGS_KEY, &raw) {
                    tracing::warn!(error = %e, "Could not persist UI settings");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Could not encode UI settings"),
        }

        self.current.send_replace(next);
        tracing::debug!(theme = %next.theme, show_content = next.show_content, show_image = next.show_image, "UI settings updated");
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forum_core::domain::Theme;
    use forum_infra::InMemoryLocalStorage;

    #[test]
    fn partial_record_merges_over_defaults() {
        let storage = Arc::new(InMemoryLocalStorage::with_item(SETTINGS_KEY, r#"{"theme":"light"}"#));
        let store = UiSettingsStore::load(storage);
        assert_eq!(
            store.current(),
            UiSettings {
                theme: Theme::Light,
                show_content: true,
                show_image: true,
            }
        );
    }

    #[test]
    fn corrupt_record_falls_back_to_defaults() {
        let storage = Arc::new(InMemoryLocalStorage::with_item(SETTINGS_KEY, "{not json"));
        let store = UiSettingsStore::load(storage);
        assert_eq!(store.current(), UiSettings::default());
    }

    #[test]
    fn array_record_falls_back_to_defaults() {
        let storage = Arc::new(InMemoryLocalStorage::with_item(
            SETTINGS_KEY,
            r#"["light", false, false]"#,
        ));
        let store = UiSettingsStore::load(storage);
        assert_eq!(store.current(), UiSettings::default());
    }

    #[test]
    fn update_persists_full_record() {
        let storage = Arc::new(InMemoryLocalStorage::new());
        let store = UiSettingsStore::load(storage.clone());

        store.update(SettingsPatch {
            show_image: Some(false),
            ..Default::default()
        });

        let raw = storage.get_item(SETTINGS_KEY).unwrap().unwrap();
        let persisted: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            persisted,
            serde_json::json!({"theme": "dark", "showContent": true, "showImage": false})
        );
    }

    #[test]
    fn subscribers_see_update_immediately() {
        let store = UiSettingsStore::load(Arc::new(InMemoryLocalStorage::new()));
        let rx = store.subscribe();

        store.update(SettingsPatch {
            theme: Some(Theme::Purple),
            ..Default::default()
        });

        assert_eq!(rx.borrow().theme, Theme::Purple);
    }
}
