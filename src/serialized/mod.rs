//! Persisted graph shape.
//!
//! Snapshots address nodes by id and ports by name (plus slot index for variadic
//! groups) instead of by arena index, so they survive a rebuild against a catalog whose
//! defines have been renamed or reshaped.

use crate::error::GraphError;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{Read, Write};

mod define;
mod graph;

pub use define::SerializableDefine;
pub use graph::{SerializableConnection, SerializableGraph, SerializableNode, SerializableNodeKind};

fn to_json<T: Serialize>(value: &T) -> Result<String, GraphError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| GraphError::Codec(format!("JSON serialization failed: {}", e)))
}

fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, GraphError> {
    serde_json::from_str(json)
        .map_err(|e| GraphError::Codec(format!("JSON deserialization failed: {}", e)))
}

fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, GraphError> {
    encode_to_vec(value, standard())
        .map_err(|e| GraphError::Codec(format!("Serialization failed: {}", e)))
}

fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, GraphError> {
    decode_from_slice(bytes, standard())
        .map(|(value, _)| value) // bincode 2 returns a tuple (data, bytes_read)
        .map_err(|e| GraphError::Codec(format!("Deserialization failed: {}", e)))
}

fn save<T: Serialize>(value: &T, path: &str) -> Result<(), GraphError> {
    let bytes = to_bytes(value)?;
    let mut file = fs::File::create(path)
        .map_err(|e| GraphError::Codec(format!("Could not create file '{}': {}", path, e)))?;
    file.write_all(&bytes)
        .map_err(|e| GraphError::Codec(format!("Could not write to file '{}': {}", path, e)))?;
    Ok(())
}

fn from_file<T: DeserializeOwned>(path: &str) -> Result<T, GraphError> {
    let mut file = fs::File::open(path)
        .map_err(|e| GraphError::Codec(format!("Could not open file '{}': {}", path, e)))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| GraphError::Codec(format!("Could not read from file '{}': {}", path, e)))?;
    from_bytes(&bytes)
}

macro_rules! impl_codecs {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $ty {
                pub fn to_json(&self) -> Result<String, GraphError> {
                    to_json(self)
                }

                pub fn from_json(json: &str) -> Result<Self, GraphError> {
                    from_json(json)
                }

                /// Encodes with bincode's standard configuration.
                pub fn to_bytes(&self) -> Result<Vec<u8>, GraphError> {
                    to_bytes(self)
                }

                pub fn from_bytes(bytes: &[u8]) -> Result<Self, GraphError> {
                    from_bytes(bytes)
                }

                /// Saves the bincode encoding to a file.
                pub fn save(&self, path: &str) -> Result<(), GraphError> {
                    save(self, path)
                }

                pub fn from_file(path: &str) -> Result<Self, GraphError> {
                    from_file(path)
                }
            }
        )*
    };
}

impl_codecs!(SerializableGraph, SerializableDefine);
