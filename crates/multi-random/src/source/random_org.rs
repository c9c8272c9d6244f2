use std::future::Future;

use crate::config::{PoolOptions, SourceDefaults};
use crate::source::{http_client, parse, Fetch};
use crate::{Error, Result};

/// Decimal fractions from [random.org](https://www.random.org).
///
/// random.org enforces a daily quota per client. Once it's used up, requests
/// fail until the quota resets.
#[derive(Debug, Clone)]
pub struct RandomOrg {
    client: reqwest::Client,
    num: String,
}

impl RandomOrg {
    pub const NAME: &'static str = "random-org";
    pub const DEFAULTS: SourceDefaults = SourceDefaults::new(64, 0.5);

    const ENDPOINT: &'static str = "https://www.random.org/decimal-fractions/";

    pub fn new(options: &PoolOptions) -> Result<Self> {
        Ok(Self {
            client: http_client(options.timeout)?,
            num: options.pool_size.to_string(),
        })
    }
}

impl Fetch for RandomOrg {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn fetch(&self) -> impl Future<Output = Result<Vec<f64>>> + Send + 'static {
        let request = self.client.get(Self::ENDPOINT).query(&[
            ("num", self.num.as_str()),
            ("dec", "6"),
            ("col", "1"),
            ("format", "plain"),
            ("rnd", "new"),
        ]);

        async move {
            let body = request.send().await?.error_for_status()?.text().await?;
            parse_plain(&body)
        }
    }
}

/// Parse a newline-delimited list of decimal fractions.
fn parse_plain(body: &str) -> Result<Vec<f64>> {
    let values = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| parse::fraction_from_decimal(RandomOrg::NAME, line))
        .collect::<Result<Vec<_>>>()?;

    if values.is_empty() {
        return Err(Error::bad_response(
            RandomOrg::NAME,
            "no values in response. the daily limit might be exceeded",
        ));
    }

    Ok(values)
}
