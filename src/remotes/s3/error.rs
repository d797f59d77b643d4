use thiserror::Error;

use super::credential::AuthorizeError;
use crate::remotes::http::HttpError;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum S3Error {
    #[error("http error: {0}")]
    Http(#[from] HttpError),
    #[error("authorize error: {0}")]
    Authorize(#[from] AuthorizeError),
    #[error("xml deserialize error: {0}")]
    XmlDeserialize(#[from] quick_xml::DeError),
}
