// src/db/documents.rs
//
// Single serialization boundary for JSON documents stored in TEXT columns.
// Absent optional fields are written as omitted keys; explicit JSON nulls
// inside free-form maps are written as null.

use crate::errors::ServerError;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn to_document<T: Serialize + ?Sized>(value: &T) -> Result<String, ServerError> {
    serde_json::to_string(value)
        .map_err(|e| ServerError::DbError(format!("encode document failed: {e}")))
}

pub fn from_document<T: DeserializeOwned>(doc: &str) -> Result<T, ServerError> {
    serde_json::from_str(doc)
        .map_err(|e| ServerError::DbError(format!("decode document failed: {e}")))
}
