//! Trained-model artifact persistence
//!
//! Stable binary artifact format (bincode envelope with checksum) plus
//! atomic save/load helpers. The artifact written here is the contract with
//! the serving side: load it and call `predict`.

mod serializer;

pub use serializer::{load_model, save_model, ModelMetadata, SerializedModel};
