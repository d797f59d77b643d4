use thiserror::Error;

use crate::{config::ConfigError, remotes::{http::HttpError, s3::S3Error}};

pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    S3(#[from] S3Error),
    #[error(transparent)]
    Other(#[from] BoxedError),
}

impl From<HttpError> for Error {
    fn from(err: HttpError) -> Self {
        Error::S3(S3Error::from(err))
    }
}

impl From<crate::remotes::s3::credential::AuthorizeError> for Error {
    fn from(err: crate::remotes::s3::credential::AuthorizeError) -> Self {
        Error::S3(S3Error::from(err))
    }
}
