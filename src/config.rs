//! Credentials and identifiers for one R2 bucket.
//!
//! Signing never reads ambient process state: the environment is consulted
//! exactly once, at the boundary, through [`R2Config::from_env`], and the
//! resulting value is handed to [`crate::R2Bucket`] explicitly.

use std::env;

use thiserror::Error;
use tracing::debug;

pub const ENV_ACCESS_KEY_ID: &str = "CLOUDFLARE_R2_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "CLOUDFLARE_R2_SECRET_ACCESS_KEY";
pub const ENV_BUCKET_NAME: &str = "CLOUDFLARE_R2_BUCKET_NAME";
pub const ENV_ACCOUNT_ID: &str = "CLOUDFLARE_R2_ACCOUNT_ID";

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing R2 configuration value: {name}")]
    Missing { name: &'static str },
}

/// Everything needed to address and authenticate against one bucket.
///
/// All four values are opaque strings. None of them is ever logged except
/// the bucket name and account id; the secret key in particular stays out
/// of every error and trace message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct R2Config {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    pub account_id: String,
}

impl R2Config {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        bucket: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            bucket: bucket.into(),
            account_id: account_id.into(),
        }
    }

    /// Reads the four `CLOUDFLARE_R2_*` variables, failing fast on the
    /// first one that is unset or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            access_key_id: required_var(ENV_ACCESS_KEY_ID)?,
            secret_access_key: required_var(ENV_SECRET_ACCESS_KEY)?,
            bucket: required_var(ENV_BUCKET_NAME)?,
            account_id: required_var(ENV_ACCOUNT_ID)?,
        };
        debug!(
            bucket = %config.bucket,
            account_id = %config.account_id,
            "loaded R2 configuration from environment"
        );
        Ok(config)
    }

    /// Rejects empty values regardless of where the config came from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (value, name) in [
            (&self.access_key_id, "access key id"),
            (&self.secret_access_key, "secret access key"),
            (&self.bucket, "bucket"),
            (&self.account_id, "account id"),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Missing { name });
            }
        }
        Ok(())
    }

    pub fn host(&self) -> String {
        format!("{}.r2.cloudflarestorage.com", self.account_id)
    }

    pub fn endpoint(&self) -> String {
        format!(
            "https://{}/{}",
            self.host(),
            self.bucket.trim_start_matches('/')
        )
    }

    /// Public URL an uploaded object is served from.
    pub fn public_url(&self, object_key: &str) -> String {
        format!("https://pub-{}.r2.dev/{}", self.account_id, object_key)
    }
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing { name }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> R2Config {
        R2Config::new("AKIDEXAMPLE", "secret", "images", "abc123")
    }

    #[test]
    fn derives_r2_urls_from_account_id() {
        let config = config();
        assert_eq!(config.host(), "abc123.r2.cloudflarestorage.com");
        assert_eq!(
            config.endpoint(),
            "https://abc123.r2.cloudflarestorage.com/images"
        );
        assert_eq!(
            config.public_url("1700000000000-ab12cd.webp"),
            "https://pub-abc123.r2.dev/1700000000000-ab12cd.webp"
        );
    }

    #[test]
    fn validate_rejects_empty_values() {
        let mut config = config();
        config.secret_access_key.clear();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Missing {
                name: "secret access key"
            }
        ));
        assert!(!err.to_string().contains("AKIDEXAMPLE"));
    }

    #[test]
    fn from_env_requires_every_variable() {
        // Single test so the process-global environment is not mutated
        // concurrently by sibling tests.
        for (name, value) in [
            (ENV_ACCESS_KEY_ID, "AKIDEXAMPLE"),
            (ENV_SECRET_ACCESS_KEY, "secret"),
            (ENV_BUCKET_NAME, "images"),
            (ENV_ACCOUNT_ID, "abc123"),
        ] {
            env::set_var(name, value);
        }
        let config = R2Config::from_env().unwrap();
        assert_eq!(config, self::config());

        env::remove_var(ENV_BUCKET_NAME);
        assert!(matches!(
            R2Config::from_env(),
            Err(ConfigError::Missing {
                name: ENV_BUCKET_NAME
            })
        ));

        env::set_var(ENV_BUCKET_NAME, "");
        assert!(matches!(
            R2Config::from_env(),
            Err(ConfigError::Missing {
                name: ENV_BUCKET_NAME
            })
        ));

        for name in [
            ENV_ACCESS_KEY_ID,
            ENV_SECRET_ACCESS_KEY,
            ENV_BUCKET_NAME,
            ENV_ACCOUNT_ID,
        ] {
            env::remove_var(name);
        }
    }
}
