use std::fmt;
use std::path::PathBuf;

use crate::config;
use crate::model::ResultSet;
use crate::runner::RunnerError;

pub const DEFAULT_INPUT: &str = "results/finalep6.json";

/// Where the results file is loaded from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResultSource {
    Url(reqwest::Url),
    File(PathBuf),
}

impl fmt::Display for ResultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

fn is_http_url(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

impl ResultSource {
    /// Absolute http(s) inputs are fetched as-is. Relative inputs are joined
    /// to `base_url` when one is given (the page hosting the viewer),
    /// otherwise they name a local file.
    pub fn resolve(input: &str, base_url: Option<&str>) -> Result<Self, RunnerError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(RunnerError::EmptyInput);
        }
        if is_http_url(input) {
            let url = reqwest::Url::parse(input).map_err(|e| RunnerError::InvalidInputUrl {
                input: input.to_string(),
                source: e,
            })?;
            return Ok(Self::Url(url));
        }
        match base_url.map(str::trim).filter(|b| !b.is_empty()) {
            Some(base) => {
                let base_parsed =
                    reqwest::Url::parse(base).map_err(|e| RunnerError::InvalidBaseUrl {
                        url: base.to_string(),
                        source: e,
                    })?;
                let url = base_parsed
                    .join(input)
                    .map_err(|e| RunnerError::InvalidInputUrl {
                        input: input.to_string(),
                        source: e,
                    })?;
                Ok(Self::Url(url))
            }
            None => Ok(Self::File(config::expand_tilde(input))),
        }
    }
}

pub fn parse_result_set(bytes: &[u8], source: &ResultSource) -> Result<ResultSet, RunnerError> {
    serde_json::from_slice::<ResultSet>(bytes).map_err(|e| RunnerError::Decode {
        source_name: source.to_string(),
        source: e,
    })
}

pub async fn load_result_set(
    source: &ResultSource,
    client: &reqwest::Client,
) -> Result<ResultSet, RunnerError> {
    let bytes = match source {
        ResultSource::Url(url) => {
            let response = client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| RunnerError::Fetch {
                    url: url.to_string(),
                    source: e,
                })?;
            let status = response.status();
            if !status.is_success() {
                return Err(RunnerError::HttpStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            response
                .bytes()
                .await
                .map_err(|e| RunnerError::Fetch {
                    url: url.to_string(),
                    source: e,
                })?
                .to_vec()
        }
        ResultSource::File(path) => {
            tokio::fs::read(path)
                .await
                .map_err(|e| RunnerError::FileRead {
                    path: path.display().to_string(),
                    source: e,
                })?
        }
    };
    parse_result_set(&bytes, source)
}
