//! Infrastructure adapters backed by S3

mod s3_object_source;

pub use s3_object_source::{ListingMode, S3ObjectSource};
