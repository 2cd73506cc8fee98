//! Core data models for works and citation relations.

mod relation;
mod work;

pub use relation::{RecordKind, RelationRecord};
pub use work::{
    standardize_date, Authors, WorkRecord, UNKNOWN_AUTHOR, UNKNOWN_TITLE, UNKNOWN_TYPE,
};
