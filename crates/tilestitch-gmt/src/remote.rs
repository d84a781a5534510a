//! Access to remote files.

use crate::{GmtError, Result};
use std::io::Write;
use std::time::Duration;
use url::Url;

/// Something that can stream a URL into a writer.
pub trait Remote {
    /// Copy the body of `url` into `dest`, returning the number of bytes written.
    ///
    /// A response with a non-success status is reported as
    /// [`GmtError::HttpStatus`].
    fn download(&self, url: &Url, dest: &mut dyn Write) -> Result<u64>;
}

/// Blocking HTTP(S) client.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::blocking::Client,
}

impl HttpRemote {
    /// Create a client with a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tilestitch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Remote for HttpRemote {
    fn download(&self, url: &Url, dest: &mut dyn Write) -> Result<u64> {
        let mut response = self.client.get(url.clone()).send()?;
        if !response.status().is_success() {
            return Err(GmtError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response.copy_to(dest)?)
    }
}
