//! AWS Signature Version 4 for unsigned-payload object uploads.
//!
//! The authorizer turns a (credential, host, bucket, object key, instant)
//! tuple into the `Authorization`, `x-amz-date` and `x-amz-content-sha256`
//! headers an S3-compatible endpoint expects, without ever transmitting the
//! secret key. The computation is pure: no clock reads, no environment
//! access, no shared state, so concurrent uploads can sign independently.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use http::{header::AUTHORIZATION, HeaderValue, Request};
use ring::{digest, hmac};
use thiserror::Error;
use tracing::debug;

use super::UNSIGNED_PAYLOAD;
use crate::config::ConfigError;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub(crate) const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const DATE_STAMP_FORMAT: &str = "%Y%m%d";

pub(crate) const CONTENT_SHA256_HEADER: &str = "x-amz-content-sha256";
pub(crate) const DATE_HEADER: &str = "x-amz-date";
const TOKEN_HEADER: &str = "x-amz-security-token";

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AuthorizeError {
    #[error("refusing to sign: {0}")]
    Config(#[from] ConfigError),
    #[error("signed header value was rejected: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsCredential {
    pub key_id: String,
    pub secret_key: String,
    /// Temporary-session token, sent and signed as `x-amz-security-token`
    /// when present.
    pub token: Option<String>,
}

/// Headers authenticating one `PUT`, valid only for the exact
/// (method, URI, headers, date) tuple they were computed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadAuthorization {
    pub authorization: String,
    pub amz_date: String,
    pub content_sha256: &'static str,
}

pub struct R2Authorizer<'a> {
    credential: &'a AwsCredential,
    region: &'a str,
    service: &'a str,
}

impl<'a> R2Authorizer<'a> {
    pub fn new(credential: &'a AwsCredential, region: &'a str) -> Self {
        Self {
            credential,
            region,
            service: "s3",
        }
    }

    pub fn with_service(mut self, service: &'a str) -> Self {
        self.service = service;
        self
    }

    /// Computes the headers for an unsigned-payload `PUT` of
    /// `/{bucket}/{object_key}` on `host`, as of the instant `at`.
    ///
    /// Callers pass `Utc::now()` and must re-invoke for every attempt,
    /// retries included: endpoints reject an `x-amz-date` that has drifted
    /// more than a few minutes, and a cached signature would carry one.
    ///
    /// Empty credential, host or bucket values are rejected before any
    /// hashing so a misconfigured caller never reaches the network.
    pub fn authorize_put(
        &self,
        host: &str,
        bucket: &str,
        object_key: &str,
        at: DateTime<Utc>,
    ) -> Result<UploadAuthorization, AuthorizeError> {
        for (value, name) in [
            (self.credential.key_id.as_str(), "access key id"),
            (self.credential.secret_key.as_str(), "secret access key"),
            (bucket, "bucket"),
            (host, "host"),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Missing { name }.into());
            }
        }
        Ok(self.sign_parts(host, &format!("/{bucket}/{object_key}"), at))
    }

    /// Signs an already-built `PUT` request in place, taking the host and
    /// canonical URI from the request itself.
    pub(crate) fn authorize_request<B>(
        &self,
        request: &mut Request<B>,
        at: DateTime<Utc>,
    ) -> Result<(), AuthorizeError> {
        for (value, name) in [
            (self.credential.key_id.as_str(), "access key id"),
            (self.credential.secret_key.as_str(), "secret access key"),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Missing { name }.into());
            }
        }
        // The authority, not just the hostname: a nonstandard port is part
        // of the Host header the client will send, so it must be signed.
        let host = request
            .uri()
            .authority()
            .ok_or(ConfigError::Missing { name: "host" })?
            .to_string();

        let authorization = self.sign_parts(&host, request.uri().path(), at);

        let headers = request.headers_mut();
        headers.insert(DATE_HEADER, HeaderValue::from_str(&authorization.amz_date)?);
        headers.insert(
            CONTENT_SHA256_HEADER,
            HeaderValue::from_static(UNSIGNED_PAYLOAD),
        );
        if let Some(token) = self.credential.token.as_deref() {
            headers.insert(TOKEN_HEADER, HeaderValue::from_str(token)?);
        }
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&authorization.authorization)?,
        );
        Ok(())
    }

    fn sign_parts(&self, host: &str, canonical_uri: &str, at: DateTime<Utc>) -> UploadAuthorization {
        // Both stamps come from the same instant; a mismatch between the
        // credential scope date and x-amz-date invalidates the signature.
        let amz_date = at.format(AMZ_DATE_FORMAT).to_string();
        let date_stamp = at.format(DATE_STAMP_FORMAT).to_string();

        let (canonical_request, signed_headers) =
            self.canonical_request(host, canonical_uri, &amz_date);
        debug!(canonical_request, "built canonical request");

        let scope = format!("{date_stamp}/{}/{}/aws4_request", self.region, self.service);
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            sha256_hex(canonical_request.as_bytes())
        );
        debug!(string_to_sign, "built string to sign");

        let signing_key = derive_signing_key(
            &self.credential.secret_key,
            &date_stamp,
            self.region,
            self.service,
        );
        let signature = hex_encode(
            hmac_sha256(signing_key.as_ref(), string_to_sign.as_bytes()).as_ref(),
        );

        UploadAuthorization {
            authorization: format!(
                "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
                self.credential.key_id
            ),
            amz_date,
            content_sha256: UNSIGNED_PAYLOAD,
        }
    }

    /// Returns the canonical request and the `SignedHeaders` list.
    fn canonical_request(
        &self,
        host: &str,
        canonical_uri: &str,
        amz_date: &str,
    ) -> (String, String) {
        let mut headers = vec![
            ("host", host),
            (CONTENT_SHA256_HEADER, UNSIGNED_PAYLOAD),
            (DATE_HEADER, amz_date),
        ];
        if let Some(token) = self.credential.token.as_deref() {
            headers.push((TOKEN_HEADER, token));
        }
        // Canonical form wants lowercase names in lexicographic order,
        // whatever order they were collected in.
        headers.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

        let canonical_headers: String = headers
            .iter()
            .map(|(name, value)| format!("{name}:{value}\n"))
            .collect();
        let signed_headers = headers
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(";");

        // The empty line after the URI is the (absent) canonical query
        // string; canonical_headers already carries its own trailing
        // newline.
        let canonical_request = format!(
            "PUT\n{canonical_uri}\n\n{canonical_headers}\n{signed_headers}\n{UNSIGNED_PAYLOAD}"
        );
        (canonical_request, signed_headers)
    }
}

/// Derives the date/region/service-scoped signing key: four chained
/// HMAC-SHA256 operations, each keyed by the previous output. Intermediate
/// tags stay raw bytes; only the final request signature is hex-encoded.
fn derive_signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> hmac::Tag {
    let seed = format!("AWS4{secret_key}");
    let mut key = hmac_sha256(seed.as_bytes(), date_stamp.as_bytes());
    for scope_part in [region, service, "aws4_request"] {
        key = hmac_sha256(key.as_ref(), scope_part.as_bytes());
    }
    key
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> hmac::Tag {
    hmac::sign(&hmac::Key::new(hmac::HMAC_SHA256, key), data)
}

fn sha256_hex(data: &[u8]) -> String {
    hex_encode(digest::digest(&digest::SHA256, data).as_ref())
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDateTime, TimeZone};
    use http_body_util::Empty;

    use super::*;

    fn frozen() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn credential(key_id: &str, secret_key: &str) -> AwsCredential {
        AwsCredential {
            key_id: key_id.into(),
            secret_key: secret_key.into(),
            token: None,
        }
    }

    #[test]
    fn known_vector_canonical_request() {
        let credential = credential("AKIDTEST", "test-secret");
        let authorizer = R2Authorizer::new(&credential, "auto");
        let (canonical_request, signed_headers) = authorizer.canonical_request(
            "example.r2.cloudflarestorage.com",
            "/bucket/obj.webp",
            "20240101T000000Z",
        );
        assert_eq!(
            canonical_request,
            "PUT\n\
             /bucket/obj.webp\n\
             \n\
             host:example.r2.cloudflarestorage.com\n\
             x-amz-content-sha256:UNSIGNED-PAYLOAD\n\
             x-amz-date:20240101T000000Z\n\
             \n\
             host;x-amz-content-sha256;x-amz-date\n\
             UNSIGNED-PAYLOAD"
        );
        assert_eq!(signed_headers, "host;x-amz-content-sha256;x-amz-date");
    }

    #[test]
    fn known_vector_signature() {
        // Expected values computed with an independent SigV4
        // implementation over the same inputs.
        let credential = credential("AKIDTEST", "test-secret");
        let authorizer = R2Authorizer::new(&credential, "auto");
        let authorization = authorizer
            .authorize_put(
                "example.r2.cloudflarestorage.com",
                "bucket",
                "obj.webp",
                frozen(),
            )
            .unwrap();
        assert_eq!(authorization.amz_date, "20240101T000000Z");
        assert_eq!(authorization.content_sha256, "UNSIGNED-PAYLOAD");
        assert_eq!(
            authorization.authorization,
            "AWS4-HMAC-SHA256 \
             Credential=AKIDTEST/20240101/auto/s3/aws4_request, \
             SignedHeaders=host;x-amz-content-sha256;x-amz-date, \
             Signature=18d260e55ecec8a66dbdc9e09a65c7a9581abd9cb67cdabf17381a2a67ffe2f9"
        );
    }

    #[test]
    fn end_to_end_authorization_header() {
        let credential = credential("AKIDEXAMPLE", "secret");
        let authorizer = R2Authorizer::new(&credential, "auto");
        let authorization = authorizer
            .authorize_put(
                "abc123.r2.cloudflarestorage.com",
                "images",
                "1700000000000-ab12cd.webp",
                frozen(),
            )
            .unwrap();

        let prefix = "AWS4-HMAC-SHA256 \
                      Credential=AKIDEXAMPLE/20240101/auto/s3/aws4_request, \
                      SignedHeaders=host;x-amz-content-sha256;x-amz-date, \
                      Signature=";
        let signature = authorization
            .authorization
            .strip_prefix(prefix)
            .expect("unexpected authorization header shape");
        assert_eq!(signature.len(), 64);
        assert!(signature
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
        assert_eq!(
            signature,
            "3c592310d21618503c9523d106051a19ae86d25a6f0279d6b06a93ec52dc88bc"
        );
    }

    #[test]
    fn deterministic_for_fixed_inputs() {
        let credential = credential("AKIDTEST", "test-secret");
        let authorizer = R2Authorizer::new(&credential, "auto");
        let first = authorizer
            .authorize_put("host.example", "bucket", "obj.webp", frozen())
            .unwrap();
        let second = authorizer
            .authorize_put("host.example", "bucket", "obj.webp", frozen())
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn secret_key_never_appears_in_output() {
        let credential = credential("AKIDTEST", "test-secret");
        let authorizer = R2Authorizer::new(&credential, "auto");
        let authorization = authorizer
            .authorize_put("host.example", "bucket", "obj.webp", frozen())
            .unwrap();
        let (canonical_request, _) =
            authorizer.canonical_request("host.example", "/bucket/obj.webp", "20240101T000000Z");

        for output in [
            authorization.authorization.as_str(),
            authorization.amz_date.as_str(),
            canonical_request.as_str(),
        ] {
            assert!(!output.contains("test-secret"));
        }
        // Only the public key id is exposed, inside Credential=.
        assert!(authorization.authorization.contains("Credential=AKIDTEST/"));
    }

    #[test]
    fn session_token_joins_signed_headers_in_order() {
        let credential = AwsCredential {
            key_id: "AKIDTEST".into(),
            secret_key: "test-secret".into(),
            token: Some("session-token".into()),
        };
        let authorizer = R2Authorizer::new(&credential, "auto");
        let (canonical_request, signed_headers) = authorizer.canonical_request(
            "host.example",
            "/bucket/obj.webp",
            "20240101T000000Z",
        );
        assert_eq!(
            signed_headers,
            "host;x-amz-content-sha256;x-amz-date;x-amz-security-token"
        );
        assert!(canonical_request.contains("x-amz-security-token:session-token\n"));
    }

    #[test]
    fn empty_inputs_are_refused_before_signing() {
        let cases: [(AwsCredential, &str, &str, &str); 4] = [
            (credential("AKIDTEST", ""), "host.example", "bucket", "secret access key"),
            (credential("", "test-secret"), "host.example", "bucket", "access key id"),
            (credential("AKIDTEST", "test-secret"), "host.example", "", "bucket"),
            (credential("AKIDTEST", "test-secret"), "", "bucket", "host"),
        ];
        for (credential, host, bucket, expected) in &cases {
            let authorizer = R2Authorizer::new(credential, "auto");
            let err = authorizer
                .authorize_put(host, bucket, "obj.webp", frozen())
                .unwrap_err();
            match err {
                AuthorizeError::Config(ConfigError::Missing { name }) => {
                    assert_eq!(&name, expected)
                }
                other => panic!("expected configuration error, got {other:?}"),
            }
        }
    }

    #[test]
    fn amz_date_tracks_the_invocation_instant() {
        let credential = credential("AKIDTEST", "test-secret");
        let authorizer = R2Authorizer::new(&credential, "auto");
        let before = Utc::now();
        let authorization = authorizer
            .authorize_put("host.example", "bucket", "obj.webp", Utc::now())
            .unwrap();
        let after = Utc::now();

        let parsed = NaiveDateTime::parse_from_str(&authorization.amz_date, AMZ_DATE_FORMAT)
            .unwrap()
            .and_utc();
        // Second-resolution stamp, so allow a one-second truncation skew.
        assert!(parsed >= before - chrono::Duration::seconds(1));
        assert!(parsed <= after);
    }

    #[test]
    fn authorize_request_applies_the_computed_headers() {
        let credential = credential("AKIDTEST", "test-secret");
        let authorizer = R2Authorizer::new(&credential, "auto");
        let mut request = Request::builder()
            .method(http::Method::PUT)
            .uri("https://example.r2.cloudflarestorage.com/bucket/obj.webp")
            .body(Empty::<bytes::Bytes>::new())
            .unwrap();
        authorizer.authorize_request(&mut request, frozen()).unwrap();

        let expected = authorizer
            .authorize_put(
                "example.r2.cloudflarestorage.com",
                "bucket",
                "obj.webp",
                frozen(),
            )
            .unwrap();
        let headers = request.headers();
        assert_eq!(
            headers.get(AUTHORIZATION).unwrap(),
            expected.authorization.as_str()
        );
        assert_eq!(headers.get(DATE_HEADER).unwrap(), "20240101T000000Z");
        assert_eq!(
            headers.get(CONTENT_SHA256_HEADER).unwrap(),
            "UNSIGNED-PAYLOAD"
        );
        assert!(headers.get(TOKEN_HEADER).is_none());
    }
}
