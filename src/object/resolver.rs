use std::collections::BTreeMap;

use crate::core::{LiveError, Result, Value};
use crate::naming::NamingScheme;
use crate::object::MARKER_FIELD;
use crate::object::transformer::FieldTransformer;
use crate::registry::{ClassRegistry, FieldKind};
use crate::store::RemoteStore;

/// Handles fields that point at other entities.
///
/// References are stored as (type name, id) pairs, never as embedded state;
/// every read targets the referenced key afresh so there is nothing to go
/// stale.
pub(crate) struct ReferenceResolver;

impl ReferenceResolver {
    /// Validates a value assigned to a reference field declared against
    /// `target`.
    pub(crate) fn check_assignment(value: &Value, target: &str) -> Result<()> {
        match value {
            Value::Null => Ok(()),
            Value::Reference(reference) => {
                if reference.type_name != target {
                    return Err(LiveError::Validation(format!(
                        "reference field expects entity '{}', got '{}'",
                        target, reference.type_name
                    )));
                }
                if reference.id.is_null() {
                    return Err(LiveError::RequiredValue(format!(
                        "referenced '{}' instance carries no id",
                        target
                    )));
                }
                Ok(())
            }
            other => Err(LiveError::Validation(format!(
                "reference field expects an entity reference, got {}",
                other.type_name()
            ))),
        }
    }

    /// Recursively materializes a stored value into its local equivalent for
    /// a detach snapshot. References become nested field maps with the id
    /// injected from the pointer (ids are never stored as map entries).
    pub(crate) fn detach_value(
        store: &dyn RemoteStore,
        naming: &dyn NamingScheme,
        registry: &ClassRegistry,
        value: Value,
    ) -> Result<Value> {
        let Value::Reference(reference) = value else {
            return Ok(value);
        };

        let metadata = registry.get_by_name(&reference.type_name).ok_or_else(|| {
            LiveError::Validation(format!(
                "cannot detach a reference to unregistered entity '{}'",
                reference.type_name
            ))
        })?;
        let key = naming.object_key(metadata.type_name(), metadata.id_field(), &reference.id)?;

        let mut fields = BTreeMap::new();
        fields.insert(metadata.id_field().to_string(), (*reference.id).clone());

        for (name, stored) in store.map_entries(&key)? {
            if name == MARKER_FIELD {
                continue;
            }
            let Some(descriptor) = metadata.field(&name) else {
                continue;
            };
            let local = match &descriptor.kind {
                FieldKind::Scalar(_) => stored,
                FieldKind::Collection(_) => {
                    FieldTransformer::materialize(store, metadata.transformation(), Some(stored))?
                }
                FieldKind::Reference(_) => Self::detach_value(store, naming, registry, stored)?,
            };
            fields.insert(name, local);
        }
        Ok(Value::Map(fields))
    }
}
