use std::time::Duration;

use thiserror::Error;

use crate::model::ResultSet;
use crate::render::{self, RenderError};
use crate::source::{self, ResultSource};

pub const DEFAULT_TITLE: &str = "Visual Dialog Results";

#[derive(Clone, Debug)]
pub struct Options {
    pub input: String,
    pub base_url: Option<String>,
    pub image_root: String,
    pub title: String,
    pub timeout_seconds: usize,
    pub proxy: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            input: source::DEFAULT_INPUT.to_string(),
            base_url: None,
            image_root: render::DEFAULT_IMAGE_ROOT.to_string(),
            title: DEFAULT_TITLE.to_string(),
            timeout_seconds: 10,
            proxy: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("no input provided")]
    EmptyInput,

    #[error("image root is empty")]
    EmptyImageRoot,

    #[error("invalid base URL: {url}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid input URL: {input}: {source}")]
    InvalidInputUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("failed to read results file: {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode results from {source_name}: {source}")]
    Decode {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The grid failed; `heading` is still valid markup for the page.
    #[error("failed to render results: {source}")]
    Render {
        heading: String,
        #[source]
        source: RenderError,
    },
}

/// Heading and grid markup for one results file.
#[derive(Clone, Debug)]
pub struct RenderedPage {
    pub title: String,
    pub heading: String,
    pub main: String,
    pub records: usize,
}

impl RenderedPage {
    /// The page written when the grid cannot be rendered: heading only,
    /// empty main region.
    pub fn heading_only(title: &str, heading: String) -> Self {
        Self {
            title: title.to_string(),
            heading,
            main: String::new(),
            records: 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Runner {
    options: Options,
}

impl Runner {
    pub fn new(options: Options) -> Result<Self, RunnerError> {
        if options.input.trim().is_empty() {
            return Err(RunnerError::EmptyInput);
        }
        if options.image_root.trim().is_empty() {
            return Err(RunnerError::EmptyImageRoot);
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn source(&self) -> Result<ResultSource, RunnerError> {
        ResultSource::resolve(&self.options.input, self.options.base_url.as_deref())
    }

    pub async fn load(&self) -> Result<ResultSet, RunnerError> {
        let source = self.source()?;
        let client = build_client(self.options.proxy.as_deref(), self.options.timeout_seconds)?;
        source::load_result_set(&source, &client).await
    }

    pub fn render(&self, results: &ResultSet) -> Result<RenderedPage, RunnerError> {
        let heading = render::render_heading(&results.opts);
        let main = match render::render_grid(&results.data, &self.options.image_root) {
            Ok(main) => main,
            Err(source) => return Err(RunnerError::Render { heading, source }),
        };
        Ok(RenderedPage {
            title: self.options.title.clone(),
            heading,
            main,
            records: results.data.len(),
        })
    }

    pub async fn run(&self) -> Result<RenderedPage, RunnerError> {
        let results = self.load().await?;
        self.render(&results)
    }
}

fn build_client(
    proxy: Option<&str>,
    timeout_seconds: usize,
) -> Result<reqwest::Client, RunnerError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static("application/json"),
    );

    let timeout = Duration::from_secs(timeout_seconds.try_into().unwrap_or(10));
    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .user_agent(concat!("dialogviz/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .timeout(timeout);

    if let Some(proxy) = proxy.filter(|p| !p.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| RunnerError::ProxySetup {
            proxy: proxy.to_string(),
            source: e,
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| RunnerError::HttpClientBuild { source: e })
}
