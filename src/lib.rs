//! Pail carries files to an S3-compatible bucket over plain HTTP, signing
//! each request itself with AWS Signature Version 4 instead of pulling in
//! an SDK. It was built for Cloudflare R2 image uploads: hand it an
//! [`R2Config`], get back the public URL of the stored object.
//!
//! # Example
//! ```no_run
//! use pail::{R2Bucket, R2Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), pail::Error> {
//!     let config = R2Config::from_env()?;
//!     let bucket = R2Bucket::builder(config).build()?;
//!     let url = bucket
//!         .upload(
//!             bytes::Bytes::from_static(b"<file bytes>"),
//!             "image/webp",
//!             "webp",
//!         )
//!         .await?;
//!     println!("uploaded to {url}");
//!     Ok(())
//! }
//! ```

pub mod config;
mod error;
pub mod key;
pub mod remotes;

pub use config::{ConfigError, R2Config};
pub use error::{BoxedError, Error};
pub use remotes::{
    http::{tokio::TokioClient, BoxBody, DynHttpClient, HttpClient, HttpError},
    s3::{
        credential::{AuthorizeError, AwsCredential, R2Authorizer, UploadAuthorization},
        R2Bucket, R2BucketBuilder, S3Error,
    },
};
