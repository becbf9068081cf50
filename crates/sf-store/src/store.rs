//! Preference store backends.

use crate::settings::SETTINGS_KEY;
use crate::settings::Settings;
use sf_core::EngineError;
use sf_core::EngineResult;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

/// Async-persisted key-value preferences, as far as the engine is concerned:
/// `get` may miss, `set` completes or fails, and failures are never fatal to
/// the caller.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> EngineResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> EngineResult<()>;
}

/// In-memory backend for tests and the demo driver.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    values: BTreeMap<String, String>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> EngineResult<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> EngineResult<()> {
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// File-backed backend: one `prefs.kv` file of hex-escaped tab-separated
/// records, so keys and values may contain anything.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            path: root.join("prefs.kv"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> EngineResult<Option<String>> {
        let map = read_kv_file(&self.path)?;
        Ok(map.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> EngineResult<()> {
        let mut map = read_kv_file(&self.path)?;
        map.insert(key.to_owned(), value.to_owned());
        write_kv_file(&self.path, &map)
    }
}

/// Loads settings through a store, falling back to defaults whenever the
/// store fails or holds nothing usable.
pub fn load_settings(store: &dyn PreferenceStore) -> Settings {
    match store.get(SETTINGS_KEY) {
        Ok(Some(raw)) => Settings::from_json_lenient(&raw),
        Ok(None) => Settings::default(),
        Err(error) => {
            log::warn!("settings read failed, using defaults: {error}");
            Settings::default()
        }
    }
}

/// Persists settings through a store.
pub fn persist_settings(store: &mut dyn PreferenceStore, settings: &Settings) -> EngineResult<()> {
    let raw = settings.to_json()?;
    store.set(SETTINGS_KEY, &raw)
}

fn read_kv_file(path: &Path) -> EngineResult<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let content = fs::read_to_string(path).map_err(|error| {
        EngineError::new(
            "store.read_failed",
            format!("failed to read `{}`: {error}", path.display()),
        )
    })?;

    let mut map = BTreeMap::new();
    for (index, line) in content.lines().enumerate() {
        if line.is_empty() {
            continue;
        }

        let (key_hex, value_hex) = line.split_once('\t').ok_or_else(|| {
            EngineError::new(
                "store.format_invalid",
                format!("invalid record at `{}` line {}", path.display(), index + 1),
            )
        })?;

        map.insert(decode_hex_string(key_hex)?, decode_hex_string(value_hex)?);
    }

    Ok(map)
}

fn write_kv_file(path: &Path, map: &BTreeMap<String, String>) -> EngineResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| {
            EngineError::new(
                "store.dir_create_failed",
                format!("failed to create `{}`: {error}", parent.display()),
            )
        })?;
    }

    let mut encoded = String::new();
    for (key, value) in map {
        encoded.push_str(&encode_hex_string(key));
        encoded.push('\t');
        encoded.push_str(&encode_hex_string(value));
        encoded.push('\n');
    }

    fs::write(path, encoded).map_err(|error| {
        EngineError::new(
            "store.write_failed",
            format!("failed to write `{}`: {error}", path.display()),
        )
    })
}

fn encode_hex_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len().saturating_mul(2));
    for byte in value.as_bytes() {
        out.push(hex_char(byte >> 4));
        out.push(hex_char(byte & 0x0f));
    }
    out
}

fn decode_hex_string(value: &str) -> EngineResult<String> {
    if !value.len().is_multiple_of(2) {
        return Err(EngineError::new(
            "store.hex_invalid",
            "hex field length must be even",
        ));
    }

    let chars: Vec<char> = value.chars().collect();
    let mut bytes = Vec::with_capacity(value.len() / 2);
    let mut index = 0_usize;
    while index < chars.len() {
        let high = decode_hex_nibble(chars[index])?;
        let low = decode_hex_nibble(chars[index + 1])?;
        bytes.push((high << 4) | low);
        index += 2;
    }

    String::from_utf8(bytes).map_err(|error| {
        EngineError::new(
            "store.utf8_invalid",
            format!("stored field is not valid UTF-8: {error}"),
        )
    })
}

fn hex_char(value: u8) -> char {
    match value {
        0..=9 => (b'0' + value) as char,
        10..=15 => (b'a' + (value - 10)) as char,
        _ => '0',
    }
}

fn decode_hex_nibble(ch: char) -> EngineResult<u8> {
    match ch {
        '0'..='9' => Ok((ch as u8) - b'0'),
        'a'..='f' => Ok((ch as u8) - b'a' + 10),
        'A'..='F' => Ok((ch as u8) - b'A' + 10),
        _ => Err(EngineError::new(
            "store.hex_invalid",
            format!("invalid hex character `{ch}`"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::FilePreferenceStore;
    use super::MemoryPreferenceStore;
    use super::PreferenceStore;
    use super::load_settings;
    use super::persist_settings;
    use crate::settings::SETTINGS_KEY;
    use crate::settings::Settings;
    use std::time::SystemTime;
    use std::time::UNIX_EPOCH;

    fn temp_store_root() -> std::path::PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|value| value.as_nanos())
            .unwrap_or_default();
        std::env::temp_dir().join(format!("stillframe-store-test-{stamp}"))
    }

    struct BrokenStore;

    impl PreferenceStore for BrokenStore {
        fn get(&self, _key: &str) -> sf_core::EngineResult<Option<String>> {
            Err(sf_core::EngineError::new("store.read_failed", "boom"))
        }

        fn set(&mut self, _key: &str, _value: &str) -> sf_core::EngineResult<()> {
            Err(sf_core::EngineError::new("store.write_failed", "boom"))
        }
    }

    #[test]
    fn file_store_roundtrips_values() {
        let root = temp_store_root();
        let mut store = FilePreferenceStore::new(root.clone());

        let wrote = store.set(SETTINGS_KEY, "{\"debug\":true}\twith\ttabs");
        assert!(wrote.is_ok());

        let loaded = store.get(SETTINGS_KEY);
        assert_eq!(loaded, Ok(Some("{\"debug\":true}\twith\ttabs".to_owned())));
        assert_eq!(store.get("otherKey"), Ok(None));

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let store = FilePreferenceStore::new(temp_store_root());
        assert_eq!(store.get(SETTINGS_KEY), Ok(None));
    }

    #[test]
    fn settings_survive_a_store_roundtrip() {
        let mut store = MemoryPreferenceStore::new();
        let settings = Settings {
            disable_hover_effects: false,
            ..Settings::default()
        };

        assert!(persist_settings(&mut store, &settings).is_ok());
        assert_eq!(load_settings(&store), settings);
    }

    #[test]
    fn failed_reads_fall_back_to_defaults() {
        assert_eq!(load_settings(&BrokenStore), Settings::default());
    }

    #[test]
    fn absent_settings_load_as_defaults() {
        let store = MemoryPreferenceStore::new();
        assert_eq!(load_settings(&store), Settings::default());
    }
}
