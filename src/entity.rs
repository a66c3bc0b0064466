use std::collections::BTreeMap;

use crate::core::{EntityRef, LiveError, Result, Value};
use crate::registry::EntityDescriptor;

/// A type whose values can be made live.
///
/// Implementations dispatch field access through the names declared in the
/// descriptor; `#[derive(Entity)]` writes all of this, plus typed accessors
/// for `LiveObject<T>`. A hand-written impl only needs the three required
/// items.
pub trait Entity: Default + Send + Sync + 'static {
    /// Registration configuration for this type, parsed and validated by the
    /// class registry.
    fn descriptor() -> EntityDescriptor;

    /// Reads one local field as a codec value. Unset fields read as
    /// [`Value::Null`]; unknown names fail with
    /// [`LiveError::FieldNotFound`].
    fn get_field(&self, field: &str) -> Result<Value>;

    /// Writes one local field from a codec value.
    fn set_field(&mut self, field: &str, value: Value) -> Result<()>;

    /// Rebuilds an instance from a field snapshot. Unknown entries are
    /// skipped so snapshots may carry bookkeeping fields.
    fn from_fields(fields: BTreeMap<String, Value>) -> Result<Self> {
        let mut entity = Self::default();
        for (name, value) in fields {
            match entity.set_field(&name, value) {
                Ok(()) | Err(LiveError::FieldNotFound(_, _)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(entity)
    }
}

/// Renders a local nested-entity field as the stored reference value.
///
/// The nested instance must already carry a non-null id; a never-persisted
/// instance without one is an error rather than an implicit persist.
pub fn reference_to_value<U: Entity>(nested: Option<&U>) -> Result<Value> {
    let Some(nested) = nested else {
        return Ok(Value::Null);
    };
    let descriptor = U::descriptor();
    let id_field = descriptor.id_field_name()?;
    let id = nested.get_field(id_field)?;
    if id.is_null() {
        return Err(LiveError::RequiredValue(id_field.to_string()));
    }
    Ok(Value::Reference(EntityRef::new(descriptor.type_name(), id)))
}

/// Rebuilds a local nested-entity field from a stored value.
///
/// Accepts the detached snapshot form (a field map) or the bare reference
/// form, in which case only the id is populated.
pub fn reference_from_value<U: Entity>(value: Value) -> Result<Option<U>> {
    match value {
        Value::Null => Ok(None),
        Value::Map(fields) => Ok(Some(U::from_fields(fields)?)),
        Value::Reference(reference) => {
            let descriptor = U::descriptor();
            let mut entity = U::default();
            entity.set_field(descriptor.id_field_name()?, *reference.id)?;
            Ok(Some(entity))
        }
        other => Err(LiveError::Validation(format!(
            "cannot rebuild an entity reference from {}",
            other.type_name()
        ))),
    }
}
