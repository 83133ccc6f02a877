//! # FoldZip S3 Adapter
//!
//! Implements the `ObjectSource` port on top of the AWS SDK for S3. Works with
//! any S3-compatible store (AWS, Cloudflare R2, MinIO) given a suitably
//! configured client.

pub mod infrastructure;

pub use infrastructure::{ListingMode, S3ObjectSource};
