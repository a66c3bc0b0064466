pub mod error;
pub mod types;
pub mod value;

pub use error::{LiveError, Result};
pub use types::{CollectionKind, IdStrategy, ObjectState, TransformationMode};
pub use value::{CollectionRef, DataType, EntityRef, Value};
