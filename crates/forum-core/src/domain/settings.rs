use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Colour scheme of the whole page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    Purple,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::Dark, Theme::Light, Theme::Purple];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
            Theme::Purple => "purple",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Theme::Dark => "Dark",
            Theme::Light => "Light",
            Theme::Purple => "Purple",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|theme| theme.as_str() == s)
            .ok_or_else(|| format!("unknown theme: {s}"))
    }
}

/// Display preferences kept on this machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSettings {
    pub theme: Theme,
    pub show_content: bool,
    pub show_image: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            show_content: true,
            show_image: true,
        }
    }
}

/// A partial update; `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_content: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_image: Option<bool>,
}

impl UiSettings {
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(show_content) = patch.show_content {
            self.show_content = show_content;
        }
        if let Some(show_image) = patch.show_image {
            self.show_image = show_image;
        }
    }

    pub fn merged(mut self, patch: SettingsPatch) -> Self {
        self.apply(patch);
        self
    }

    /// Overlay a persisted record on the defaults. Missing keys keep their
    /// default; unknown keys are ignored. The record must be a JSON object.
    pub fn from_persisted(raw: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(serde::de::Error::custom("settings record is not an object"));
        }
        let patch: SettingsPatch = serde_json::from_value(value)?;
        Ok(Self::default().merged(patch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_theme_merges_over_defaults() {
        let settings = UiSettings::from_persisted(r#"{"theme":"light"}"#).unwrap();
        assert_eq!(
            settings,
            UiSettings {
                theme: Theme::Light,
                show_content: true,
                show_image: true,
            }
        );
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(UiSettings::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"theme": "dark", "showContent": true, "showImage": true})
        );
    }

    #[test]
    fn corrupt_or_invalid_records_are_errors() {
        assert!(UiSettings::from_persisted("not json").is_err());
        assert!(UiSettings::from_persisted(r#"{"theme":"neon"}"#).is_err());
        assert!(UiSettings::from_persisted(r#"["dark"]"#).is_err());
        assert!(UiSettings::from_persisted(r#"["light", false, false]"#).is_err());
        assert!(UiSettings::from_persisted("null").is_err());
        assert!(UiSettings::from_persisted("42").is_err());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let settings = UiSettings::from_persisted(r#"{"showImage":false,"fontSize":14}"#).unwrap();
        assert!(!settings.show_image);
        assert_eq!(settings.theme, Theme::Dark);
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let settings = UiSettings::default().merged(SettingsPatch {
            show_content: Some(false),
            ..Default::default()
        });
        assert_eq!(settings.theme, Theme::Dark);
        assert!(!settings.show_content);
        assert!(settings.show_image);
    }
}
