use std::fmt::Debug;

use http::Extensions;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Encoding failed with: {0}")]
    Encode(String),

    #[error("Decoding failed with: {0}")]
    Decode(String),

    #[error("{0}")]
    Backend(String),
}

/// A synchronous string key/value area, shaped after the browser's local storage.
///
/// Writes are last-write-wins. Nothing serializes concurrent writers of the same key.
pub trait StorageArea: Debug + Clone + Send + Sync + 'static {
    /// Gets the raw value stored at `key`.
    fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Sets `key` to `value`, replacing any previous value.
    fn set(&self, key: &str, value: String) -> Result<(), Error>;

    /// Removes `key`.
    ///
    /// Returns `true` if a value was present.
    fn remove(&self, key: &str) -> Result<bool, Error>;
}

/// Resolves the [`StorageArea`] that serves a single request.
pub trait StorageProvider: Clone + Send + Sync + 'static {
    type Storage: StorageArea;

    /// Returns `None` when the request does not carry what the storage needs.
    fn provide(&self, extensions: &Extensions) -> Option<Self::Storage>;
}
