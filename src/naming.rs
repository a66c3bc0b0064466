use crate::core::{LiveError, Result, Value};

/// Derives remote key names from entity identity.
///
/// A scheme must be a pure function: identical inputs always produce the
/// identical literal key, across calls and across processes. Everything the
/// engine stores hangs off keys produced here.
pub trait NamingScheme: Send + Sync {
    /// Key of the remote map backing one live instance.
    fn object_key(&self, type_name: &str, id_field: &str, id: &Value) -> Result<String>;

    /// Key of the remote collection backing a collection-typed field of the
    /// object at `object_key`.
    fn collection_field_key(&self, object_key: &str, field: &str) -> String;

    /// Key of the per-type atomic counter used by sequence id allocation.
    fn sequence_key(&self, type_name: &str, id_field: &str) -> String;
}

const OBJECT_PREFIX: &str = "live_object";
const SEQUENCE_PREFIX: &str = "live_object_sequence";

/// The stock scheme: `live_object:{Type}:{idField}:{id}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNamingScheme;

impl NamingScheme for DefaultNamingScheme {
    fn object_key(&self, type_name: &str, id_field: &str, id: &Value) -> Result<String> {
        if id.is_null() {
            return Err(LiveError::RequiredValue(id_field.to_string()));
        }
        Ok(format!(
            "{}:{}:{}:{}",
            OBJECT_PREFIX,
            type_name,
            id_field,
            id.render_id()?
        ))
    }

    fn collection_field_key(&self, object_key: &str, field: &str) -> String {
        format!("{}:{}", object_key, field)
    }

    fn sequence_key(&self, type_name: &str, id_field: &str) -> String {
        format!("{}:{}:{}", SEQUENCE_PREFIX, type_name, id_field)
    }
}
