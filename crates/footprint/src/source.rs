//! Where raw vector tiles come from.

use crate::coord::TilePosition;
use crate::error::FetchError;
use bytes::Bytes;

/// Supplies the raw vector tile bytes for one position.
///
/// Implementations perform exactly one attempt per call; retry policy, if
/// any, belongs to the caller.
pub trait TileSource {
    fn fetch(&self, position: TilePosition) -> Result<Bytes, FetchError>;
}

impl<T: TileSource + ?Sized> TileSource for &T {
    fn fetch(&self, position: TilePosition) -> Result<Bytes, FetchError> {
        (**self).fetch(position)
    }
}

#[cfg(feature = "http")]
pub use http::HttpTileSource;

#[cfg(feature = "http")]
mod http {
    use super::TileSource;
    use crate::config::SourceConfig;
    use crate::coord::TilePosition;
    use crate::error::{Error, FetchError, Result};
    use bytes::Bytes;
    use std::time::Duration;
    use tracing::debug;

    const USER_AGENT: &str = concat!("footprint/", env!("CARGO_PKG_VERSION"));

    /// Blocking HTTP client against `{base_url}/{row}/{col}?key={api_key}`.
    pub struct HttpTileSource {
        client: reqwest::blocking::Client,
        config: SourceConfig,
    }

    impl HttpTileSource {
        pub fn new(config: SourceConfig) -> Result<Self> {
            if config.base_url.is_empty() {
                return Err(Error::Config("tile source base_url is not set".into()));
            }
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .user_agent(USER_AGENT)
                .build()
                .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;
            Ok(Self { client, config })
        }
    }

    impl TileSource for HttpTileSource {
        fn fetch(&self, position: TilePosition) -> std::result::Result<Bytes, FetchError> {
            let url = self.config.tile_url(position.row, position.col);
            debug!(row = position.row, col = position.col, "Fetching tile");

            // The URL carries the API key, so errors are reported without it.
            let transport = |e: reqwest::Error| FetchError::Transport {
                position,
                message: e.without_url().to_string(),
            };

            let response = self.client.get(&url).send().map_err(transport)?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    position,
                    status: status.as_u16(),
                });
            }
            response.bytes().map_err(transport)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_requires_base_url() {
            assert!(matches!(
                HttpTileSource::new(SourceConfig::default()),
                Err(Error::Config(_))
            ));
        }

        #[test]
        fn test_builds_with_base_url() {
            let config = SourceConfig {
                base_url: "http://127.0.0.1:9".into(),
                timeout_secs: 1,
                ..Default::default()
            };
            assert!(HttpTileSource::new(config).is_ok());
        }

        #[test]
        fn test_unreachable_host_is_transport_error() {
            let config = SourceConfig {
                base_url: "http://127.0.0.1:9".into(),
                api_key: "secret".into(),
                timeout_secs: 1,
                ..Default::default()
            };
            let source = HttpTileSource::new(config).unwrap();
            match source.fetch(TilePosition::new(1, 2)) {
                Err(FetchError::Transport { position, message }) => {
                    assert_eq!(position, TilePosition::new(1, 2));
                    assert!(!message.contains("secret"));
                }
                other => panic!("expected transport error, got {other:?}"),
            }
        }
    }
}
