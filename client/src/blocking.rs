//! Blocking front end over the shared query core.
//!
//! Owns a private tokio runtime and drives the async client to
//! completion on the calling thread. The runtime is multi-threaded so
//! the supervisor's stdout drain keeps running between calls, like the
//! consumer thread a long-lived server needs.

use langtool_types::{CheckOptions, LanguageSet, LanguageTag, Match, UnsupportedLanguage};
use url::Url;

use crate::{ClientError, LanguageTool, Settings};

/// Blocking LanguageTool client; every call runs synchronously on the
/// caller's thread.
///
/// Must not be constructed or used from inside an async context — use
/// [`LanguageTool`] there instead.
#[derive(Debug)]
pub struct BlockingLanguageTool {
    runtime: tokio::runtime::Runtime,
    inner: LanguageTool,
}

impl BlockingLanguageTool {
    pub fn connect(settings: Settings) -> Result<Self, ClientError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(ClientError::Runtime)?;
        let inner = runtime.block_on(LanguageTool::connect(settings))?;
        Ok(Self { runtime, inner })
    }

    pub fn check(&mut self, text: &str) -> Result<Vec<Match>, ClientError> {
        self.runtime.block_on(self.inner.check(text))
    }

    pub fn check_with(
        &mut self,
        text: &str,
        options: &CheckOptions,
    ) -> Result<Vec<Match>, ClientError> {
        self.runtime.block_on(self.inner.check_with(text, options))
    }

    pub fn correct(&mut self, text: &str) -> Result<String, ClientError> {
        self.runtime.block_on(self.inner.correct(text))
    }

    #[must_use]
    pub fn languages(&self) -> &LanguageSet {
        self.inner.languages()
    }

    pub fn tag(&self, tag: &str) -> Result<LanguageTag, UnsupportedLanguage> {
        self.inner.tag(tag)
    }

    #[must_use]
    pub fn options(&self) -> &CheckOptions {
        self.inner.options()
    }

    pub fn set_options(&mut self, options: CheckOptions) {
        self.inner.set_options(options);
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        self.inner.url()
    }

    #[must_use]
    pub fn server_port(&self) -> Option<u16> {
        self.inner.server_port()
    }

    /// Terminate the supervised local server, if any. Idempotent.
    pub fn close(&mut self) {
        self.runtime.block_on(self.inner.close());
    }
}
