//! Request extractors.

pub mod headers;

pub use headers::ForwardedHeaders;
