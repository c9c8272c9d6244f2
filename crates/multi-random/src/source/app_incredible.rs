use std::future::Future;

use serde::Deserialize;

use crate::config::{PoolOptions, SourceDefaults};
use crate::source::{http_client, parse, Fetch};
use crate::{Error, Result};

/// True random numbers from the AppIncredible generator.
///
/// Requests ask for ten digit integers. Each integer's digits become the
/// fractional part of a value, so `4815162342` is `0.4815162342`.
#[derive(Debug, Clone)]
pub struct AppIncredible {
    client: reqwest::Client,
    num_total: String,
}

impl AppIncredible {
    pub const NAME: &'static str = "app-incredible-trng";
    pub const DEFAULTS: SourceDefaults = SourceDefaults::new(512, 0.7);

    const ENDPOINT: &'static str = "http://appincredible.com/controllers/randomnumbergenerator.php";

    pub fn new(options: &PoolOptions) -> Result<Self> {
        Ok(Self {
            client: http_client(options.timeout)?,
            num_total: options.pool_size.to_string(),
        })
    }
}

impl Fetch for AppIncredible {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn fetch(&self) -> impl Future<Output = Result<Vec<f64>>> + Send + 'static {
        let request = self.client.post(Self::ENDPOINT).form(&[
            ("numMin", "1000000000"),
            ("numMax", "9999999999"),
            ("numTotal", self.num_total.as_str()),
            ("numDecimal", "0"),
            ("rbAlgorithm", "2"),
            ("rbSeparator", "5"),
            ("rbSort", "1"),
        ]);

        async move {
            let body = request.send().await?.error_for_status()?.text().await?;
            parse_json(&body)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrngResponse {
    success: bool,
    #[serde(default)]
    multi_random: Option<Vec<Digits>>,
}

// the generator has returned both JSON strings and bare numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Digits {
    Text(String),
    Number(u64),
}

fn parse_json(body: &str) -> Result<Vec<f64>> {
    let response: TrngResponse = serde_json::from_str(body)
        .map_err(|e| Error::bad_response(AppIncredible::NAME, format!("invalid json: {e}")))?;

    if !response.success {
        return Err(Error::bad_response(
            AppIncredible::NAME,
            "request was not successful",
        ));
    }

    let values = match response.multi_random {
        Some(values) if !values.is_empty() => values,
        _ => {
            return Err(Error::bad_response(
                AppIncredible::NAME,
                "response has no values",
            ))
        }
    };

    values
        .iter()
        .map(|digits| match digits {
            Digits::Text(s) => parse::fraction_from_digits(AppIncredible::NAME, s),
            Digits::Number(n) => parse::fraction_from_digits(AppIncredible::NAME, &n.to_string()),
        })
        .collect()
}
