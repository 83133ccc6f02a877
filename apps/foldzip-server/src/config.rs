//! Service configuration
//!
//! Everything is read from the process environment (optionally seeded from a
//! `.env` file by `main`). Cloudflare R2 variable names are accepted as
//! fallbacks so an R2 deployment needs no extra mapping.

use std::fmt;

use anyhow::{bail, Context, Result};
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use foldzip_s3::ListingMode;
use tracing::info;

const DEFAULT_BUCKET: &str = "photos";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_STREAM_BUFFER: usize = 16;

/// Static access keys for the object store
#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Runtime configuration of the download service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub credentials: Option<StaticCredentials>,
    /// Path-style addressing, required by MinIO
    pub force_path_style: bool,
    pub host: String,
    pub port: u16,
    /// Capacity of the archive output channel, in chunks
    pub stream_buffer: usize,
    pub listing_mode: ListingMode,
}

impl ServerConfig {
    /// Load the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the configuration through an arbitrary variable lookup
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let first = |names: &[&str]| names.iter().find_map(|name| var(name));

        let bucket = first(&["FOLDZIP_BUCKET", "CLOUDFLARE_BUCKET_NAME"]).unwrap_or_else(|| {
            info!("FOLDZIP_BUCKET not set, using default: {DEFAULT_BUCKET}");
            DEFAULT_BUCKET.to_string()
        });

        let endpoint = var("FOLDZIP_S3_ENDPOINT").or_else(|| {
            var("CLOUDFLARE_ACCOUNT_ID")
                .map(|account| format!("https://{account}.r2.cloudflarestorage.com"))
        });

        let region = first(&["FOLDZIP_S3_REGION", "CLOUDFLARE_REGION"]);

        let credentials = match (
            var("CLOUDFLARE_ACCESS_KEY_ID"),
            var("CLOUDFLARE_SECRET_ACCESS_KEY"),
        ) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
                access_key_id,
                secret_access_key,
            }),
            (None, None) => None,
            _ => bail!(
                "CLOUDFLARE_ACCESS_KEY_ID and CLOUDFLARE_SECRET_ACCESS_KEY must be set together"
            ),
        };

        let force_path_style = var("FOLDZIP_FORCE_PATH_STYLE")
            .map(|value| parse_bool("FOLDZIP_FORCE_PATH_STYLE", &value))
            .transpose()?
            .unwrap_or(true);

        let host = var("FOLDZIP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = var("PORT")
            .map(|value| {
                value
                    .parse::<u16>()
                    .with_context(|| format!("PORT must be a port number, got '{value}'"))
            })
            .transpose()?
            .unwrap_or(DEFAULT_PORT);

        let stream_buffer = var("FOLDZIP_STREAM_BUFFER")
            .map(|value| {
                value.parse::<usize>().with_context(|| {
                    format!("FOLDZIP_STREAM_BUFFER must be a chunk count, got '{value}'")
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_STREAM_BUFFER);
        if stream_buffer == 0 {
            bail!("FOLDZIP_STREAM_BUFFER must be at least 1");
        }

        let paginate = var("FOLDZIP_PAGINATE_LISTINGS")
            .map(|value| parse_bool("FOLDZIP_PAGINATE_LISTINGS", &value))
            .transpose()?
            .unwrap_or(true);
        let listing_mode = if paginate {
            ListingMode::Paginated
        } else {
            ListingMode::SinglePage
        };

        Ok(Self {
            bucket,
            endpoint,
            region,
            credentials,
            force_path_style,
            host,
            port,
            stream_buffer,
            listing_mode,
        })
    }

    /// Address the HTTP listener binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the shared S3 client
    ///
    /// Starts from the AWS default provider chain and overrides endpoint,
    /// region and credentials when they are configured.
    pub async fn s3_client(&self) -> aws_sdk_s3::Client {
        let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;

        let mut builder =
            aws_sdk_s3::config::Builder::from(&aws_config).force_path_style(self.force_path_style);

        if let Some(endpoint) = &self.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if let Some(region) = &self.region {
            builder = builder.region(Region::new(region.clone()));
        }
        if let Some(credentials) = &self.credentials {
            builder = builder.credentials_provider(Credentials::new(
                &credentials.access_key_id,
                &credentials.secret_access_key,
                None,
                None,
                "foldzip-environment",
            ));
        }

        aws_sdk_s3::Client::from_conf(builder.build())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{name} must be a boolean, got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();

        assert_eq!(config.bucket, "photos");
        assert_eq!(config.endpoint, None);
        assert_eq!(config.credentials, None);
        assert!(config.force_path_style);
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.stream_buffer, 16);
        assert_eq!(config.listing_mode, ListingMode::Paginated);
    }

    #[test]
    fn test_cloudflare_variables() {
        let config = config(&[
            ("CLOUDFLARE_ACCOUNT_ID", "abc123"),
            ("CLOUDFLARE_ACCESS_KEY_ID", "key"),
            ("CLOUDFLARE_SECRET_ACCESS_KEY", "s3cr3t-value"),
            ("CLOUDFLARE_REGION", "auto"),
            ("CLOUDFLARE_BUCKET_NAME", "sessions"),
            ("PORT", "8080"),
        ])
        .unwrap();

        assert_eq!(config.bucket, "sessions");
        assert_eq!(
            config.endpoint.as_deref(),
            Some("https://abc123.r2.cloudflarestorage.com")
        );
        assert_eq!(config.region.as_deref(), Some("auto"));
        assert_eq!(config.port, 8080);
        let credentials = config.credentials.unwrap();
        assert_eq!(credentials.access_key_id, "key");
        assert_eq!(credentials.secret_access_key, "s3cr3t-value");
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("s3cr3t-value"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_explicit_values_win_over_fallbacks() {
        let config = config(&[
            ("FOLDZIP_BUCKET", "primary"),
            ("CLOUDFLARE_BUCKET_NAME", "fallback"),
            ("FOLDZIP_S3_ENDPOINT", "http://localhost:9000"),
            ("CLOUDFLARE_ACCOUNT_ID", "abc123"),
            ("FOLDZIP_PAGINATE_LISTINGS", "false"),
            ("FOLDZIP_FORCE_PATH_STYLE", "0"),
        ])
        .unwrap();

        assert_eq!(config.bucket, "primary");
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.listing_mode, ListingMode::SinglePage);
        assert!(!config.force_path_style);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(config(&[("PORT", "http")]).is_err());
        assert!(config(&[("FOLDZIP_STREAM_BUFFER", "0")]).is_err());
        assert!(config(&[("FOLDZIP_PAGINATE_LISTINGS", "maybe")]).is_err());
        assert!(config(&[("CLOUDFLARE_ACCESS_KEY_ID", "key")]).is_err());
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let config = config(&[("FOLDZIP_BUCKET", ""), ("PORT", " ")]).unwrap();
        assert_eq!(config.bucket, "photos");
        assert_eq!(config.port, 3000);
    }
}
