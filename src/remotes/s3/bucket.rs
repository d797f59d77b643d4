//! The bucket handle: builds, signs and sends single-shot `PUT` uploads.

use std::{str::FromStr, sync::Arc, time::Duration};

use bytes::Bytes;
use http::{
    header::{CONTENT_LENGTH, CONTENT_TYPE},
    Method, Request,
};
use http_body_util::{BodyExt, Full};
use percent_encoding::utf8_percent_encode;
use tracing::{debug, warn};
use url::Url;

use super::{
    credential::AwsCredential, options::S3Options, sign::Sign, S3Error, S3ResponseError,
    STRICT_PATH_ENCODE_SET,
};
use crate::{
    config::R2Config,
    error::Error,
    key,
    remotes::http::{tokio::TokioClient, DynHttpClient, HttpClient, HttpError},
};

const DEFAULT_REGION: &str = "auto";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct R2BucketBuilder {
    config: R2Config,
    region: String,
    session_token: Option<String>,
    timeout: Duration,
    client: Option<Box<dyn DynHttpClient>>,
}

impl R2BucketBuilder {
    pub fn new(config: R2Config) -> Self {
        Self {
            config,
            region: DEFAULT_REGION.into(),
            session_token: None,
            timeout: DEFAULT_TIMEOUT,
            client: None,
        }
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Deadline for each upload request. Ignored when a custom client is
    /// supplied.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Swaps the HTTP client, e.g. for a stub in tests.
    pub fn client(mut self, client: Box<dyn DynHttpClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<R2Bucket, Error> {
        self.config.validate()?;

        let endpoint = self.config.endpoint();
        let endpoint_url = Url::from_str(&endpoint)
            .map_err(|e| S3Error::from(HttpError::from(e)))?;
        debug!(endpoint = %endpoint_url, region = %self.region, "configured R2 bucket");

        let client = match self.client {
            Some(client) => client,
            None => Box::new(
                TokioClient::with_timeout(self.timeout).map_err(S3Error::from)?,
            ),
        };

        Ok(R2Bucket {
            inner: Arc::new(R2BucketInner {
                options: S3Options {
                    endpoint,
                    bucket: self.config.bucket.clone(),
                    region: self.region,
                    credential: AwsCredential {
                        key_id: self.config.access_key_id,
                        secret_key: self.config.secret_access_key,
                        token: self.session_token,
                    },
                },
                public_base: format!("https://pub-{}.r2.dev", self.config.account_id),
                client,
            }),
        })
    }
}

/// Handle to one R2 bucket. Cheap to clone; uploads from any number of
/// tasks sign and send independently.
#[derive(Clone)]
pub struct R2Bucket {
    inner: Arc<R2BucketInner>,
}

impl std::fmt::Debug for R2Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("R2Bucket").finish_non_exhaustive()
    }
}

struct R2BucketInner {
    options: S3Options,
    public_base: String,
    client: Box<dyn DynHttpClient>,
}

impl R2Bucket {
    pub fn builder(config: R2Config) -> R2BucketBuilder {
        R2BucketBuilder::new(config)
    }

    /// Uploads `body` under a freshly generated object key and returns the
    /// public URL it is served from.
    pub async fn upload(
        &self,
        body: Bytes,
        content_type: &str,
        extension: &str,
    ) -> Result<String, Error> {
        let object_key = key::object_key(extension);
        self.put_object(&object_key, body, content_type).await
    }

    /// Uploads `body` as `{bucket}/{object_key}` and returns the public
    /// URL.
    ///
    /// Every call signs afresh, so retrying a failed upload by calling
    /// again produces a new `x-amz-date` and signature; a replayed stale
    /// timestamp is itself grounds for rejection by the endpoint.
    pub async fn put_object(
        &self,
        object_key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<String, Error> {
        let inner = self.inner.as_ref();
        let url = format!(
            "{}/{}",
            inner.options.endpoint,
            utf8_percent_encode(object_key, &STRICT_PATH_ENCODE_SET)
        );
        debug!(
            bucket = %inner.options.bucket,
            %url,
            size = body.len(),
            content_type,
            "uploading object"
        );

        let mut request = Request::builder()
            .method(Method::PUT)
            .uri(url.as_str())
            .header(CONTENT_LENGTH, body.len())
            .header(CONTENT_TYPE, content_type)
            .body(Full::new(body))
            .map_err(|e| S3Error::from(HttpError::from(e)))?;
        request.sign(&inner.options).map_err(S3Error::from)?;

        let response = inner
            .client
            .send_request(request)
            .await
            .map_err(S3Error::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = String::from_utf8_lossy(
                &response
                    .into_body()
                    .collect()
                    .await
                    .map_err(S3Error::from)?
                    .to_bytes(),
            )
            .to_string();
            if let Ok(remote) = quick_xml::de::from_str::<S3ResponseError>(&body) {
                if !remote.code.is_empty() {
                    warn!(
                        code = %remote.code,
                        message = %remote.message,
                        "endpoint rejected upload"
                    );
                }
            }
            return Err(S3Error::from(HttpError::HttpNotSuccess { status, body }).into());
        }

        let public_url = format!("{}/{}", inner.public_base, object_key);
        debug!(%public_url, "upload complete");
        Ok(public_url)
    }
}
