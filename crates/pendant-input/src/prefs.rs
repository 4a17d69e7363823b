//! Opaque key-value preference store.
//!
//! Persisted settings (the selected button-strip layout, display
//! brightness and friends) live outside this crate; integrations back this
//! trait with NVS, a settings file, or an in-memory map in tests.

pub trait PrefStore {
    fn get_i32(&self, key: &str) -> Option<i32>;
    fn set_i32(&mut self, key: &str, value: i32);
}
