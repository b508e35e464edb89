use thiserror::Error;

/// Error returned by the mandatory-access lookups (`try_get`,
/// `try_get_mut`): the caller asked for a key the map does not hold, and
/// no default value is invented on its behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The requested key is not present in the map.
    #[error("key not found")]
    KeyNotFound,
}

/// Error returned by cursor insertions when the given key would not sort
/// strictly between the cursor position's neighbors. The map is left
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("key is not properly ordered relative to its neighbors")]
pub struct UnorderedKeyError;
