use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use log::debug;

use crate::core::{
    CollectionKind, DataType, IdStrategy, LiveError, Result, TransformationMode,
};
use crate::entity::Entity;
use crate::generator::IdGenerator;
use crate::naming::NamingScheme;

/// Declared shape of one entity field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Scalar(DataType),
    Collection(CollectionKind),
    /// The field holds a reference to another entity type, stored by key.
    Reference(&'static str),
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub id: bool,
    pub strategy: Option<IdStrategy>,
}

/// Registration configuration for one entity type: the id field and its
/// generation strategy, the transformation mode and the ordered field list.
/// Built by hand or by `#[derive(Entity)]`; validated when registered.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    type_name: &'static str,
    transformation: TransformationMode,
    field_accessor: bool,
    fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    pub fn builder(type_name: &'static str) -> EntityDescriptorBuilder {
        EntityDescriptorBuilder {
            descriptor: Self {
                type_name,
                transformation: TransformationMode::default(),
                field_accessor: false,
                fields: Vec::new(),
            },
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn transformation(&self) -> TransformationMode {
        self.transformation
    }

    pub fn field_accessor_enabled(&self) -> bool {
        self.field_accessor
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The single id field, or a validation error when the descriptor does
    /// not declare exactly one.
    pub fn id_descriptor(&self) -> Result<&FieldDescriptor> {
        let mut ids = self.fields.iter().filter(|f| f.id);
        match (ids.next(), ids.next()) {
            (Some(id), None) => Ok(id),
            (first, _) => Err(LiveError::Validation(format!(
                "entity '{}' must declare exactly one id field, found {}",
                self.type_name,
                if first.is_none() { 0 } else { 2 }
            ))),
        }
    }

    pub fn id_field_name(&self) -> Result<&'static str> {
        Ok(self.id_descriptor()?.name)
    }
}

pub struct EntityDescriptorBuilder {
    descriptor: EntityDescriptor,
}

impl EntityDescriptorBuilder {
    pub fn field(mut self, name: &'static str, data_type: DataType) -> Self {
        self.descriptor.fields.push(FieldDescriptor {
            name,
            kind: FieldKind::Scalar(data_type),
            id: false,
            strategy: None,
        });
        self
    }

    pub fn collection_field(mut self, name: &'static str, kind: CollectionKind) -> Self {
        self.descriptor.fields.push(FieldDescriptor {
            name,
            kind: FieldKind::Collection(kind),
            id: false,
            strategy: None,
        });
        self
    }

    pub fn reference_field(mut self, name: &'static str, target: &'static str) -> Self {
        self.descriptor.fields.push(FieldDescriptor {
            name,
            kind: FieldKind::Reference(target),
            id: false,
            strategy: None,
        });
        self
    }

    pub fn id_field(mut self, name: &'static str, data_type: DataType) -> Self {
        self.descriptor.fields.push(FieldDescriptor {
            name,
            kind: FieldKind::Scalar(data_type),
            id: true,
            strategy: None,
        });
        self
    }

    pub fn id_field_with(
        mut self,
        name: &'static str,
        data_type: DataType,
        strategy: IdStrategy,
    ) -> Self {
        self.descriptor.fields.push(FieldDescriptor {
            name,
            kind: FieldKind::Scalar(data_type),
            id: true,
            strategy: Some(strategy),
        });
        self
    }

    /// An id field whose declared type is itself an entity. Always rejected
    /// at registration; exists so the derive can surface the misuse as a
    /// validation error rather than a compile failure.
    pub fn id_reference_field(mut self, name: &'static str, target: &'static str) -> Self {
        self.descriptor.fields.push(FieldDescriptor {
            name,
            kind: FieldKind::Reference(target),
            id: true,
            strategy: None,
        });
        self
    }

    pub fn transformation(mut self, mode: TransformationMode) -> Self {
        self.descriptor.transformation = mode;
        self
    }

    pub fn field_accessor(mut self, enabled: bool) -> Self {
        self.descriptor.field_accessor = enabled;
        self
    }

    pub fn build(self) -> EntityDescriptor {
        self.descriptor
    }
}

/// Validated per-type metadata: the descriptor plus everything derived from
/// it once at registration time (resolved id strategy, cached id generator).
#[derive(Debug)]
pub struct EntityMetadata {
    type_name: &'static str,
    transformation: TransformationMode,
    field_accessor: bool,
    fields: Vec<FieldDescriptor>,
    id_field: &'static str,
    id_type: DataType,
    strategy: IdStrategy,
    generator: IdGenerator,
}

impl EntityMetadata {
    /// Parses and validates a descriptor (the §3 invariants: exactly one id
    /// field, id not array-like, id not an entity reference, strategy/id
    /// type agreement, unique field names).
    pub fn from_descriptor(
        descriptor: &EntityDescriptor,
        naming: &dyn NamingScheme,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for field in descriptor.fields() {
            if !seen.insert(field.name) {
                return Err(LiveError::Validation(format!(
                    "entity '{}' declares field '{}' more than once",
                    descriptor.type_name(),
                    field.name
                )));
            }
        }

        let id = descriptor.id_descriptor()?;
        let id_type = match &id.kind {
            FieldKind::Scalar(data_type) => {
                if data_type.is_array_like() {
                    return Err(LiveError::Validation(format!(
                        "id field '{}' cannot be an array type",
                        id.name
                    )));
                }
                *data_type
            }
            FieldKind::Reference(_) => {
                return Err(LiveError::Validation(
                    "id field cannot be of a type which is itself a registered entity".into(),
                ));
            }
            FieldKind::Collection(_) => {
                return Err(LiveError::Validation(format!(
                    "id field '{}' cannot be a collection",
                    id.name
                )));
            }
        };

        let strategy = match id.strategy {
            Some(strategy) => strategy,
            None => match id_type {
                DataType::Text => IdStrategy::Random,
                _ => IdStrategy::Explicit,
            },
        };
        match (strategy, id_type) {
            (IdStrategy::Sequence, DataType::Integer) => {}
            (IdStrategy::Sequence, other) => {
                return Err(LiveError::Validation(format!(
                    "sequence id generation requires an INTEGER id field, '{}' is {}",
                    id.name, other
                )));
            }
            (IdStrategy::Random, DataType::Text) => {}
            (IdStrategy::Random, other) => {
                return Err(LiveError::Validation(format!(
                    "random id generation requires a TEXT id field, '{}' is {}",
                    id.name, other
                )));
            }
            (IdStrategy::Explicit, _) => {}
        }

        let generator = IdGenerator::new(strategy, descriptor.type_name(), id.name, naming);

        Ok(Self {
            type_name: descriptor.type_name(),
            transformation: descriptor.transformation(),
            field_accessor: descriptor.field_accessor_enabled(),
            fields: descriptor.fields().to_vec(),
            id_field: id.name,
            id_type,
            strategy,
            generator,
        })
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn transformation(&self) -> TransformationMode {
        self.transformation
    }

    pub fn field_accessor_enabled(&self) -> bool {
        self.field_accessor
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn id_field(&self) -> &'static str {
        self.id_field
    }

    pub fn id_type(&self) -> DataType {
        self.id_type
    }

    pub fn id_strategy(&self) -> IdStrategy {
        self.strategy
    }

    pub fn generator(&self) -> &IdGenerator {
        &self.generator
    }

    pub fn is_id(&self, field: &str) -> bool {
        self.id_field == field
    }
}

#[derive(Default)]
struct RegistryInner {
    by_type: HashMap<TypeId, Arc<EntityMetadata>>,
    by_name: HashMap<String, Arc<EntityMetadata>>,
}

/// Per-client cache of registered entity metadata.
///
/// Owned by one client handle and shared by reference with every façade
/// derived from it; two independently constructed clients never share
/// registration state, even over the same backing store.
pub struct ClassRegistry {
    naming: Arc<dyn NamingScheme>,
    inner: RwLock<RegistryInner>,
}

impl ClassRegistry {
    pub fn new(naming: Arc<dyn NamingScheme>) -> Self {
        Self {
            naming,
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    /// Parses, validates and caches `T`'s metadata. Re-registering replaces
    /// the cached entry.
    pub fn register<T: Entity>(&self) -> Result<Arc<EntityMetadata>> {
        let descriptor = T::descriptor();
        let metadata = Arc::new(EntityMetadata::from_descriptor(
            &descriptor,
            self.naming.as_ref(),
        )?);
        let mut inner = self.inner.write()?;
        inner
            .by_type
            .insert(TypeId::of::<T>(), Arc::clone(&metadata));
        inner
            .by_name
            .insert(metadata.type_name().to_string(), Arc::clone(&metadata));
        debug!("registered entity type '{}'", metadata.type_name());
        Ok(metadata)
    }

    /// Returns `T`'s cached metadata, registering it on first use.
    pub fn ensure<T: Entity>(&self) -> Result<Arc<EntityMetadata>> {
        if let Some(metadata) = self.get::<T>() {
            return Ok(metadata);
        }
        self.register::<T>()
    }

    pub fn unregister<T: Entity>(&self) -> Result<()> {
        let mut inner = self.inner.write()?;
        if let Some(metadata) = inner.by_type.remove(&TypeId::of::<T>()) {
            inner.by_name.remove(metadata.type_name());
            debug!("unregistered entity type '{}'", metadata.type_name());
        }
        Ok(())
    }

    pub fn is_registered<T: Entity>(&self) -> bool {
        self.inner
            .read()
            .map(|inner| inner.by_type.contains_key(&TypeId::of::<T>()))
            .unwrap_or(false)
    }

    pub fn get<T: Entity>(&self) -> Option<Arc<EntityMetadata>> {
        self.inner
            .read()
            .ok()?
            .by_type
            .get(&TypeId::of::<T>())
            .cloned()
    }

    pub fn get_by_name(&self, type_name: &str) -> Option<Arc<EntityMetadata>> {
        self.inner.read().ok()?.by_name.get(type_name).cloned()
    }
}
