pub(crate) mod bucket;
pub mod credential;
mod error;
pub(crate) mod options;
pub(crate) mod sign;

pub use bucket::{R2Bucket, R2BucketBuilder};
pub use credential::AwsCredential;
pub use error::S3Error;
use serde::Deserialize;

const STRICT_ENCODE_SET: percent_encoding::AsciiSet = percent_encoding::NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');
const STRICT_PATH_ENCODE_SET: percent_encoding::AsciiSet = STRICT_ENCODE_SET.remove(b'/');

/// Sentinel standing in for the payload hash; the body is not hashed
/// before upload, the signature covers everything else.
pub(crate) const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "PascalCase")]
pub(crate) struct S3ResponseError {
    pub code: String,
    pub message: String,
    pub resource: String,
    pub request_id: String,
}
