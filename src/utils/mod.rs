//! Utility functions and types

pub mod data_loader;

pub use data_loader::{
    dataframe_to_array, load_csv_matrix, split_features_labels, FEATURE_NAMES, TARGET_NAME,
};
