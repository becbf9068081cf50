//! Persisted configuration: validated settings and the preference store
//! backends they live behind.

pub mod settings;
pub mod store;

pub use settings::SETTINGS_KEY;
pub use settings::Settings;
pub use store::FilePreferenceStore;
pub use store::MemoryPreferenceStore;
pub use store::PreferenceStore;
pub use store::load_settings;
pub use store::persist_settings;
