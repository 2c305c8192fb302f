//! HTTP client for a local or remote LanguageTool server.
//!
//! # Architecture
//!
//! One shared core ([`query`]) builds requests, recovers from transport
//! failures, and decodes responses; two thin front ends schedule it:
//!
//! - [`LanguageTool`] — async, for callers already on a tokio runtime
//! - [`BlockingLanguageTool`] — owns a private runtime and blocks the
//!   calling thread
//!
//! A client either supervises a **local** server (spawned on the first
//! free port, restarted once per check on transport failure) or talks to
//! a **remote** one (never spawned, never restarted).
//!
//! # Concurrency
//!
//! A client serves a single logical thread of control: checks take
//! `&mut self` because a transport failure may tear down and restart the
//! supervised server mid-call. Clone-free sharing across threads is not
//! supported; create one client per thread of control instead.
//!
//! ```no_run
//! # async fn demo() -> Result<(), langtool_client::ClientError> {
//! use langtool_client::{LanguageTool, Settings};
//!
//! let mut tool = LanguageTool::connect(Settings::default()).await?;
//! let matches = tool.check("Teh cat sat.").await?;
//! println!("{} problems found", matches.len());
//! println!("{}", tool.correct("Teh cat sat.").await?);
//! # Ok(())
//! # }
//! ```

mod blocking;
pub(crate) mod query;

use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use langtool_server::locate::Installation;
use langtool_server::supervisor::Supervisor;
use langtool_types::{
    CheckOptions, CheckResponse, Language, LanguageSet, LanguageTag, Match, UnsupportedLanguage,
};

pub use blocking::BlockingLanguageTool;
pub use langtool_server;
pub use langtool_types as types;

/// Environment override for the hosted endpoint used by
/// [`Settings::public_api`].
pub const REMOTE_SERVER_ENV: &str = "LANGTOOL_SERVER";

const DEFAULT_PUBLIC_API: &str = "https://api.languagetool.org/";
const DEFAULT_LANGUAGE: &str = "en-US";
const DEFAULT_HOST: &str = "127.0.0.1";
/// Attempt budget per check: the original request plus one
/// restart-and-resend.
const DEFAULT_ATTEMPTS: u32 = 2;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("locating the LanguageTool installation")]
    Locate(#[from] langtool_server::LocateError),
    #[error("starting the LanguageTool server")]
    Startup(#[from] langtool_server::StartupError),
    /// Transport-level failure that survived the attempt budget.
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with something that is not the expected JSON.
    #[error("server returned a malformed response (HTTP {status}): {body}")]
    Decode {
        status: StatusCode,
        body: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    UnsupportedLanguage(#[from] UnsupportedLanguage),
    #[error("invalid server URL '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// Restarting the local server after a transport failure failed
    /// itself; this replaces the stale transport error.
    #[error("local server restart failed after a transport error")]
    Restart(#[source] langtool_server::StartupError),
    #[error("a config file cannot be passed to a remote server")]
    RemoteConfig,
    #[error("building HTTP client")]
    Http(#[source] reqwest::Error),
    #[error("building blocking runtime")]
    Runtime(#[source] std::io::Error),
}

/// Construction-time configuration for both client front ends.
#[derive(Debug, Clone)]
pub struct Settings {
    language: String,
    mother_tongue: Option<String>,
    remote_server: Option<String>,
    host: String,
    config_file: Option<PathBuf>,
    install_dir: Option<PathBuf>,
    runtime_options: Vec<String>,
    server_options: Vec<String>,
    attempts: u32,
    timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            mother_tongue: None,
            remote_server: None,
            host: DEFAULT_HOST.to_string(),
            config_file: None,
            install_dir: None,
            runtime_options: Vec::new(),
            server_options: Vec::new(),
            attempts: DEFAULT_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Settings {
    /// Target the hosted LanguageTool API ([`REMOTE_SERVER_ENV`] or the
    /// public endpoint) instead of spawning a local server.
    #[must_use]
    pub fn public_api() -> Self {
        let remote = std::env::var(REMOTE_SERVER_ENV)
            .unwrap_or_else(|_| DEFAULT_PUBLIC_API.to_string());
        Self::default().with_remote_server(remote)
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    #[must_use]
    pub fn with_mother_tongue(mut self, tongue: impl Into<String>) -> Self {
        self.mother_tongue = Some(tongue.into());
        self
    }

    /// Use an externally hosted server instead of spawning one. A bare
    /// `host:port` is accepted; `http://` is assumed when no scheme is
    /// given.
    #[must_use]
    pub fn with_remote_server(mut self, url: impl Into<String>) -> Self {
        self.remote_server = Some(url.into());
        self
    }

    /// Host the local server is reached on (default `127.0.0.1`).
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Server config file passed through as `--config`; never parsed
    /// here. Rejected for remote servers.
    #[must_use]
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Where installed LanguageTool versions live; defaults to
    /// `LANGTOOL_PATH` or the user cache dir.
    #[must_use]
    pub fn with_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = Some(dir.into());
        self
    }

    /// JVM flags for the spawned server (e.g. `-Xmx512m`).
    #[must_use]
    pub fn with_runtime_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runtime_options
            .extend(options.into_iter().map(Into::into));
        self
    }

    /// Extra arguments appended to the server command line.
    #[must_use]
    pub fn with_server_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.server_options
            .extend(options.into_iter().map(Into::into));
        self
    }

    /// Attempt budget per check, including the initial request.
    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Request timeout for each HTTP round-trip.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug)]
enum Backend {
    Remote,
    Local { supervisor: Supervisor, host: String },
}

impl Backend {
    /// Transport-failure recovery: restart a local server and report its
    /// new base URL; a remote server has nothing to restart.
    async fn recover(&mut self) -> Result<Option<Url>, ClientError> {
        match self {
            Self::Remote => Ok(None),
            Self::Local { supervisor, host } => {
                let stderr = supervisor.terminate().await;
                if !stderr.is_empty() {
                    tracing::debug!(%stderr, "server output collected at restart");
                }
                let port = supervisor.start().await.map_err(ClientError::Restart)?;
                tracing::info!(port, "restarted local server after transport failure");
                Ok(Some(local_base_url(host, port)?))
            }
        }
    }
}

/// Async LanguageTool client.
///
/// Constructed with [`connect`](Self::connect), which spawns and
/// supervises a local server unless [`Settings`] point at a remote one,
/// then fetches and caches the server's supported languages.
#[derive(Debug)]
pub struct LanguageTool {
    http: reqwest::Client,
    base: Url,
    backend: Backend,
    languages: LanguageSet,
    options: CheckOptions,
    attempts: u32,
}

impl LanguageTool {
    pub async fn connect(settings: Settings) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(ClientError::Http)?;

        let (mut base, backend) = match &settings.remote_server {
            Some(remote) => {
                if settings.config_file.is_some() {
                    return Err(ClientError::RemoteConfig);
                }
                (parse_base_url(remote)?, Backend::Remote)
            }
            None => {
                let installation = match &settings.install_dir {
                    Some(dir) => Installation::discover_in(dir)?,
                    None => Installation::discover()?,
                };
                let mut command = installation
                    .server_command()
                    .runtime_options(settings.runtime_options.clone())
                    .extra_options(settings.server_options.clone());
                if let Some(config) = &settings.config_file {
                    command = command.with_config_file(config.clone());
                }
                let mut supervisor = Supervisor::new(command);
                let port = supervisor.start().await?;
                let base = local_base_url(&settings.host, port)?;
                let host = settings.host.clone();
                (base, Backend::Local { supervisor, host })
            }
        };

        // One fetch for the client's lifetime; tags validate against it.
        let (status, body) =
            query::get_with_recovery(&http, &mut base, "languages", &[], 1, async || Ok(None))
                .await?;
        let entries: Vec<Language> = query::decode_json(status, body)?;
        let languages = LanguageSet::new(&entries);

        let mut options = CheckOptions::new(languages.tag(&settings.language)?);
        if let Some(tongue) = &settings.mother_tongue {
            options = options.with_mother_tongue(languages.tag(tongue)?);
        }

        Ok(Self {
            http,
            base,
            backend,
            languages,
            options,
            attempts: settings.attempts,
        })
    }

    /// Check `text` with this client's default options.
    pub async fn check(&mut self, text: &str) -> Result<Vec<Match>, ClientError> {
        let options = self.options.clone();
        self.check_with(text, &options).await
    }

    /// Check `text` with explicit per-call options.
    pub async fn check_with(
        &mut self,
        text: &str,
        options: &CheckOptions,
    ) -> Result<Vec<Match>, ClientError> {
        let params = options.query_params(text);
        let backend = &mut self.backend;
        let (status, body) = query::get_with_recovery(
            &self.http,
            &mut self.base,
            "check",
            &params,
            self.attempts,
            async || backend.recover().await,
        )
        .await?;
        let response: CheckResponse = query::decode_json(status, body)?;
        Ok(response.matches)
    }

    /// Check `text` and apply the best replacement of every match.
    pub async fn correct(&mut self, text: &str) -> Result<String, ClientError> {
        let matches = self.check(text).await?;
        Ok(langtool_types::correct(text, &matches))
    }

    /// The supported languages reported by the server at construction.
    #[must_use]
    pub fn languages(&self) -> &LanguageSet {
        &self.languages
    }

    /// Validate a tag against the cached supported-language set.
    pub fn tag(&self, tag: &str) -> Result<LanguageTag, UnsupportedLanguage> {
        self.languages.tag(tag)
    }

    #[must_use]
    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    /// Replace the default options used by [`check`](Self::check).
    pub fn set_options(&mut self, options: CheckOptions) {
        self.options = options;
    }

    /// Base URL requests are sent to (ends in `/v2/`).
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.base
    }

    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self.backend, Backend::Remote)
    }

    /// Port of the supervised local server, if any.
    #[must_use]
    pub fn server_port(&self) -> Option<u16> {
        match &self.backend {
            Backend::Local { supervisor, .. } => supervisor.port(),
            Backend::Remote => None,
        }
    }

    /// Terminate the supervised local server, if any. Idempotent.
    pub async fn close(&mut self) {
        if let Backend::Local { supervisor, .. } = &mut self.backend {
            supervisor.terminate().await;
        }
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    let invalid = |source| ClientError::InvalidUrl {
        url: raw.to_string(),
        source,
    };
    let mut url = Url::parse(&with_scheme).map_err(invalid)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.join("v2/").map_err(invalid)
}

fn local_base_url(host: &str, port: u16) -> Result<Url, ClientError> {
    let raw = format!("http://{host}:{port}/v2/");
    Url::parse(&raw).map_err(|source| ClientError::InvalidUrl {
        url: raw.clone(),
        source,
    })
}
