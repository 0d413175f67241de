//! Typed views of the stored collections and the task table.

pub mod egg_record;
pub mod evaluation_request;
pub mod frame;
pub mod patient;
pub mod retrieval_batch;
pub mod status;
pub mod task;

use serde::{Deserialize, Deserializer};

/// Deserialize `null` as the type's default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
