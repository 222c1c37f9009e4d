use super::Value;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Serialize a value using bincode
pub fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| Error::Encoding(format!("Serialization failed: {}", e)))
}

/// Deserialize a value from a byte slice using bincode
pub fn deserialize<T: for<'a> Deserialize<'a>>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes)
        .map_err(|e| Error::Encoding(format!("Deserialization failed: {}", e)))
}

// Implement Value trait for types that can be serialized/deserialized
impl<T> Value for T
where
    T: Serialize + for<'a> Deserialize<'a>,
{
    fn encode(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        deserialize(bytes)
    }
}
