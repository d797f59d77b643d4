use chrono::{DateTime, Utc};
use http::Request;

use super::{
    credential::{AuthorizeError, R2Authorizer},
    options::S3Options,
};

/// Applies the SigV4 headers to an outbound request.
pub(crate) trait Sign {
    /// Signs with the current wall clock. Every attempt goes through here
    /// again, retries included; signatures are never cached across calls.
    fn sign(&mut self, options: &S3Options) -> Result<(), AuthorizeError>;

    fn sign_at(&mut self, options: &S3Options, at: DateTime<Utc>) -> Result<(), AuthorizeError>;
}

impl<B> Sign for Request<B> {
    fn sign(&mut self, options: &S3Options) -> Result<(), AuthorizeError> {
        self.sign_at(options, Utc::now())
    }

    fn sign_at(&mut self, options: &S3Options, at: DateTime<Utc>) -> Result<(), AuthorizeError> {
        R2Authorizer::new(&options.credential, &options.region).authorize_request(self, at)
    }
}
