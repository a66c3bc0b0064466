use uuid::Uuid;

use crate::core::{IdStrategy, LiveError, Result, Value};
use crate::naming::NamingScheme;
use crate::store::RemoteStore;

/// Identifier allocator for one entity type.
///
/// Built once at registration time from the type's declared [`IdStrategy`]
/// and cached inside the metadata, so allocation never re-derives keys.
#[derive(Debug, Clone)]
pub enum IdGenerator {
    /// No generation; the caller must supply the id.
    Explicit { id_field: String },
    /// Strictly increasing integers from the per-type counter at the store.
    /// Correctness rests on the store's `incr` being atomic.
    Sequence { sequence_key: String },
    /// Random 128-bit token, canonical hyphenated text.
    Random,
}

impl IdGenerator {
    pub fn new(
        strategy: IdStrategy,
        type_name: &str,
        id_field: &str,
        naming: &dyn NamingScheme,
    ) -> Self {
        match strategy {
            IdStrategy::Explicit => Self::Explicit {
                id_field: id_field.to_string(),
            },
            IdStrategy::Sequence => Self::Sequence {
                sequence_key: naming.sequence_key(type_name, id_field),
            },
            IdStrategy::Random => Self::Random,
        }
    }

    /// Allocates a fresh id. Only called when the instance carries none.
    pub fn generate(&self, store: &dyn RemoteStore) -> Result<Value> {
        match self {
            Self::Explicit { id_field } => Err(LiveError::RequiredValue(id_field.clone())),
            Self::Sequence { sequence_key } => Ok(Value::Integer(store.incr(sequence_key)?)),
            Self::Random => Ok(Value::Text(Uuid::new_v4().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::DefaultNamingScheme;
    use crate::store::MemoryStore;

    #[test]
    fn test_sequence_counts_from_one_per_type() {
        let store = MemoryStore::new();
        let scheme = DefaultNamingScheme;
        let first = IdGenerator::new(IdStrategy::Sequence, "TypeA", "id", &scheme);
        let second = IdGenerator::new(IdStrategy::Sequence, "TypeB", "id", &scheme);

        assert_eq!(first.generate(&store).unwrap(), Value::Integer(1));
        assert_eq!(first.generate(&store).unwrap(), Value::Integer(2));
        // an unrelated type starts its own sequence
        assert_eq!(second.generate(&store).unwrap(), Value::Integer(1));
    }

    #[test]
    fn test_random_is_canonical_v4() {
        let store = MemoryStore::new();
        let generator = IdGenerator::new(IdStrategy::Random, "TypeA", "id", &DefaultNamingScheme);

        let id = generator.generate(&store).unwrap();
        let text = id.as_str().unwrap();
        let parsed = Uuid::parse_str(text).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
        assert_eq!(parsed.get_variant(), uuid::Variant::RFC4122);
        assert_eq!(text, parsed.hyphenated().to_string());
    }

    #[test]
    fn test_explicit_requires_value() {
        let store = MemoryStore::new();
        let generator = IdGenerator::new(IdStrategy::Explicit, "TypeA", "id", &DefaultNamingScheme);

        let err = generator.generate(&store).unwrap_err();
        assert!(matches!(err, LiveError::RequiredValue(field) if field == "id"));
    }
}
