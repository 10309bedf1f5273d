use crate::{IntoOperation, Result};

mod kvs;

pub use self::kvs::{CommandLog, KvStore};

/// Trait for a key value storage engine driven by textual operations.
pub trait KvsEngine {
    /// Executes one operation and returns the response text.
    ///
    /// When `persist` is true, an operation that changes the key space is
    /// appended to the engine's log before it is applied.
    ///
    /// # Errors
    ///
    /// `KvsError::MissingKey`, `KvsError::MissingValue` and
    /// `KvsError::KeyNotFound` for operations that cannot be satisfied,
    /// `KvsError::MalformedOperation` for unparseable request text. Unknown
    /// commands are not an error.
    fn execute<T: IntoOperation>(&mut self, request: T, persist: bool) -> Result<String>;
}
