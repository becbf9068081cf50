//! Validated boolean toggles with fixed defaults.

use serde::Serialize;
use serde_json::Value;

/// Storage key the settings document is persisted under.
pub const SETTINGS_KEY: &str = "hoverDisableSettings";

/// User-facing configuration. Every toggle always resolves to a boolean;
/// anything malformed in storage falls back to its default on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub disable_previews: bool,
    pub disable_hover_effects: bool,
    pub disable_animations: bool,
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            disable_previews: true,
            disable_hover_effects: true,
            disable_animations: true,
            debug: false,
        }
    }
}

impl Settings {
    pub fn to_json(&self) -> sf_core::EngineResult<String> {
        serde_json::to_string(self).map_err(|error| {
            sf_core::EngineError::new(
                "store.settings_serialize_failed",
                format!("failed to serialize settings: {error}"),
            )
        })
    }

    /// Lenient load: each toggle is taken from the stored document only when
    /// it is present and a boolean; everything else keeps its default. A
    /// document that is not a JSON object yields pure defaults.
    pub fn from_json_lenient(raw: &str) -> Self {
        let mut settings = Self::default();
        let parsed: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(error) => {
                log::warn!("stored settings are not valid JSON, using defaults: {error}");
                return settings;
            }
        };

        let Value::Object(map) = parsed else {
            log::warn!("stored settings are not an object, using defaults");
            return settings;
        };

        take_bool(&map, "disablePreviews", &mut settings.disable_previews);
        take_bool(&map, "disableHoverEffects", &mut settings.disable_hover_effects);
        take_bool(&map, "disableAnimations", &mut settings.disable_animations);
        take_bool(&map, "debug", &mut settings.debug);
        settings
    }
}

fn take_bool(map: &serde_json::Map<String, Value>, key: &str, out: &mut bool) {
    match map.get(key) {
        Some(Value::Bool(value)) => *out = *value,
        Some(other) => {
            log::warn!("setting `{key}` has invalid type ({other}), reverting to default");
        }
        None => {}
    }
}
