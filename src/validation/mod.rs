mod locator;
mod outcome;
mod sections;
mod validator;


pub use locator::{LocatedReference, References, locate};
pub use outcome::{ValidationOutcome, ValidationReport, ValidationStatus};
pub use sections::{
    SectionDefinition, SectionFlags, SectionId, UNMAPPED_SECTION, default_sections, map_to_sections,
};
pub use validator::{DEFAULT_MAX_CONCURRENT_LOOKUPS, Validator};
