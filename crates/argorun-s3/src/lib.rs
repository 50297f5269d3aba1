//! S3 object-store backend for the container runner.
//!
//! Wraps a configured [`aws_sdk_s3::Client`] behind
//! [`argorun_core::ObjectStore`]. Client construction (credentials, region,
//! custom endpoint) stays with the application bootstrap.

mod store;
pub use store::S3Store;
