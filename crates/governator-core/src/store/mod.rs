//! Configuration store: flat string keys read by service supervisors.

pub mod etcd;

pub use etcd::EtcdConfigStore;

use crate::error::Result;

/// Per-key writes into the configuration store.
///
/// Writes are independent; there is no multi-key transaction.
pub trait ConfigStore {
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

impl<T: ConfigStore + ?Sized> ConfigStore for Box<T> {
    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

impl<T: ConfigStore + ?Sized> ConfigStore for &T {
    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}
