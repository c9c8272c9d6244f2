use std::future::Future;

use serde::Deserialize;

use crate::config::{PoolOptions, SourceDefaults};
use crate::source::{http_client, parse, Fetch};
use crate::{Error, Result};

/// Quantum random numbers from the [ANU QRNG](https://qrng.anu.edu.au) JSON
/// API.
///
/// The API returns blocks of hex. Each block is read as an integer and its
/// decimal digits become a fraction, so a block of `"1f"` is `0.31`. This
/// isn't uniform over `[0, 1)` (a leading zero digit can never appear), but
/// it's how these values have always been derived.
#[derive(Debug, Clone)]
pub struct QrngAu {
    client: reqwest::Client,
    length: String,
    size: String,
}

impl QrngAu {
    pub const NAME: &'static str = "qrng-au";
    pub const DEFAULTS: SourceDefaults = SourceDefaults::new(512, 0.7).with_block_size(5);

    /// The largest block whose integer value still fits in a u128.
    pub const MAX_BLOCK_SIZE: u32 = 16;

    const ENDPOINT: &'static str = "https://qrng.anu.edu.au/API/jsonI.php";

    pub fn new(options: &PoolOptions) -> Result<Self> {
        let block_size = options.block_size.unwrap_or(5);
        if block_size > Self::MAX_BLOCK_SIZE {
            return Err(Error::configuration(format!(
                "blockSize must be at most {}, got {block_size}",
                Self::MAX_BLOCK_SIZE
            )));
        }

        Ok(Self {
            client: http_client(options.timeout)?,
            length: options.pool_size.to_string(),
            size: block_size.to_string(),
        })
    }
}

impl Fetch for QrngAu {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn fetch(&self) -> impl Future<Output = Result<Vec<f64>>> + Send + 'static {
        let request = self.client.get(Self::ENDPOINT).query(&[
            ("length", self.length.as_str()),
            ("size", self.size.as_str()),
            ("type", "hex16"),
        ]);

        async move {
            let body = request.send().await?.error_for_status()?.text().await?;
            parse_json(&body)
        }
    }
}

#[derive(Debug, Deserialize)]
struct QrngResponse {
    success: bool,
    #[serde(default)]
    data: Option<Vec<String>>,
}

fn parse_json(body: &str) -> Result<Vec<f64>> {
    let response: QrngResponse = serde_json::from_str(body)
        .map_err(|e| Error::bad_response(QrngAu::NAME, format!("invalid json: {e}")))?;

    if !response.success {
        return Err(Error::bad_response(QrngAu::NAME, "request was not successful"));
    }

    let data = match response.data {
        Some(data) if !data.is_empty() => data,
        _ => return Err(Error::bad_response(QrngAu::NAME, "response has no data")),
    };

    data.iter()
        .map(|block| parse::fraction_from_hex(QrngAu::NAME, block))
        .collect()
}
