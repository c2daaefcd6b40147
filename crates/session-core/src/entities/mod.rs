//! Entity structs for session documents.
//!
//! A `SessionRecord` maps to one row of the `sessions` table. Its `data` is a
//! tagged union: virtual studies get a typed payload, every other session type
//! is kept as an opaque JSON object.

mod session;
mod virtual_study;

pub use session::{NewSession, SessionData, SessionRecord};
pub use virtual_study::{
    ANONYMOUS_OWNER, AppliedFilters, FilterMap, StudyRef, VIRTUAL_STUDY_TYPE, VirtualStudy,
};
