use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A message schema with a fixed topic name on the bus.
pub trait Topic: Serialize + DeserializeOwned {
    const NAME: &'static str;
}

/// Published by the overlay when the user submits non-empty text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlaySubmit {
    pub text: String,
}

impl Topic for OverlaySubmit {
    const NAME: &'static str = "overlay.submit";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
}

impl Display for ThemeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThemeMode::Light => write!(f, "light"),
            ThemeMode::Dark => write!(f, "dark"),
        }
    }
}

impl From<winit::window::Theme> for ThemeMode {
    fn from(theme: winit::window::Theme) -> Self {
        match theme {
            winit::window::Theme::Light => ThemeMode::Light,
            winit::window::Theme::Dark => ThemeMode::Dark,
        }
    }
}

/// Published by the main context whenever the effective theme changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeChanged {
    pub mode: ThemeMode,
}

impl Topic for ThemeChanged {
    const NAME: &'static str = "theme.changed";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_submit_wire_shape() {
        let value = serde_json::to_value(OverlaySubmit {
            text: "buy milk".to_string(),
        })
        .unwrap();
        assert_eq!(value, json!({ "text": "buy milk" }));
    }

    #[test]
    fn test_theme_wire_shape() {
        let value = serde_json::to_value(ThemeChanged {
            mode: ThemeMode::Dark,
        })
        .unwrap();
        assert_eq!(value, json!({ "mode": "dark" }));

        let parsed: ThemeChanged = serde_json::from_value(json!({ "mode": "light" })).unwrap();
        assert_eq!(parsed.mode, ThemeMode::Light);
    }

    #[test]
    fn test_unknown_theme_rejected() {
        assert!(serde_json::from_value::<ThemeChanged>(json!({ "mode": "sepia" })).is_err());
    }
}
