pub mod document;
pub mod kind;
pub mod model;
pub mod path;
pub mod process;
pub mod record;
pub mod reference;
pub mod version;

// Re-export commonly used types
pub use document::{DatasetNode, DocumentError};
pub use kind::{EntityKind, UnknownKind};
pub use model::{EdgeDocument, ModelDocument};
pub use path::{PathPrefix, PathStep, ValidationPath};
pub use process::{Direction, Exchange};
pub use record::EntityRecord;
pub use reference::{EntityReference, LocalizedText, ReferenceShape};
pub use version::{RefVersion, VersionError, VersionString};
