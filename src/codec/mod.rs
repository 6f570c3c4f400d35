//! Resource document codec: records to and from JSON:API documents.

pub mod document;
pub mod validation;

pub use document::{IdPolicy, ResourceCodec};
pub use validation::{check_attribute, coerce_query_value};
