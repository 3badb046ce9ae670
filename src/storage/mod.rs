//! Reading and writing models in the JSON interchange format.

pub mod json_backend;

use crate::errors::ModelError;

pub type Result<T> = std::result::Result<T, ModelError>;

pub use json_backend::{
    load_model_from_path, load_model_from_str, model_to_string, save_model_to_path,
};
