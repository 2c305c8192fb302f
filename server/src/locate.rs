//! Finding the Java runtime and the LanguageTool server archive.
//!
//! Locating and launching is all this crate does with the installation —
//! downloading LanguageTool is someone else's job. The expected layout is
//! `<install dir>/LanguageTool-<version>/languagetool-server.jar` (or one
//! of the other archive names shipped over the years).

use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use globset::{Glob, GlobSet, GlobSetBuilder};
use thiserror::Error;

/// Environment override for the installation directory.
pub const INSTALL_DIR_ENV: &str = "LANGTOOL_PATH";

/// Subdirectory of the user cache dir holding installations.
const INSTALL_DIR_NAME: &str = "langtool";

/// Installation directories are named `LanguageTool-<version>`.
const INSTALL_PREFIX: &str = "LanguageTool";

/// Known server archive names, in priority order.
const ARCHIVE_PATTERNS: &[&str] = &[
    "languagetool-server.jar",
    "languagetool-standalone*.jar",
    "LanguageTool.jar",
    "LanguageTool.uno.jar",
];

#[cfg(windows)]
const JAVA_BINARY: &str = "java.exe";
#[cfg(not(windows))]
const JAVA_BINARY: &str = "java";

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("can't find a Java runtime; install Java or set JAVA_HOME")]
    JavaNotFound(#[source] which::Error),
    #[error("no usable cache directory; set {INSTALL_DIR_ENV}")]
    NoCacheDir,
    #[error("no LanguageTool installation found in {}", .dir.display())]
    InstallationNotFound { dir: PathBuf },
    #[error("no server archive found in {}", .dir.display())]
    ArchiveNotFound { dir: PathBuf },
    #[error("reading {}", .dir.display())]
    Io {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A located runtime plus server archive, ready to spawn.
#[derive(Debug, Clone)]
pub struct Installation {
    pub java: PathBuf,
    pub archive: PathBuf,
}

impl Installation {
    /// Locate the runtime and the newest installed LanguageTool under the
    /// default installation directory ([`INSTALL_DIR_ENV`] or the user
    /// cache dir).
    pub fn discover() -> Result<Self, LocateError> {
        let dir = default_install_dir().ok_or(LocateError::NoCacheDir)?;
        Self::discover_in(&dir)
    }

    /// Locate the runtime and the newest installed LanguageTool under
    /// `dir`.
    pub fn discover_in(dir: &Path) -> Result<Self, LocateError> {
        let java = find_java()?;
        let install = latest_install(dir)?;
        let archive = find_archive(&install)?;
        tracing::debug!(
            java = %java.display(),
            archive = %archive.display(),
            "located LanguageTool installation"
        );
        Ok(Self { java, archive })
    }

    /// Build the command line for spawning this installation's server.
    #[must_use]
    pub fn server_command(&self) -> crate::supervisor::ServerCommand {
        crate::supervisor::ServerCommand::new(&self.java, &self.archive)
    }
}

/// The installation directory: [`INSTALL_DIR_ENV`] if set, else
/// `<cache dir>/langtool`.
#[must_use]
pub fn default_install_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(INSTALL_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }
    dirs::cache_dir().map(|cache| cache.join(INSTALL_DIR_NAME))
}

/// Find the Java executable, honoring `JAVA_HOME` before `PATH`.
pub fn find_java() -> Result<PathBuf, LocateError> {
    if let Ok(home) = std::env::var("JAVA_HOME") {
        let mut bin = PathBuf::from(home);
        if !bin.ends_with("bin") {
            bin.push("bin");
        }
        let candidate = bin.join(JAVA_BINARY);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    which::which(JAVA_BINARY).map_err(LocateError::JavaNotFound)
}

/// Pick the lexicographically-greatest `LanguageTool*` subdirectory of
/// `dir` — a naive "latest version" heuristic that matches how the
/// archives are named.
pub fn latest_install(dir: &Path) -> Result<PathBuf, LocateError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(LocateError::InstallationNotFound {
                dir: dir.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(LocateError::Io {
                dir: dir.to_path_buf(),
                source,
            });
        }
    };

    let mut best: Option<(String, PathBuf)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(INSTALL_PREFIX) {
            continue;
        }
        if best.as_ref().is_none_or(|(b, _)| name > b.as_str()) {
            best = Some((name.to_string(), path));
        }
    }

    best.map(|(_, path)| path)
        .ok_or(LocateError::InstallationNotFound {
            dir: dir.to_path_buf(),
        })
}

/// Find the server archive inside an installation directory, preferring
/// earlier entries of [`ARCHIVE_PATTERNS`].
pub fn find_archive(install: &Path) -> Result<PathBuf, LocateError> {
    let entries = std::fs::read_dir(install).map_err(|source| LocateError::Io {
        dir: install.to_path_buf(),
        source,
    })?;

    let mut names: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();

    let matcher = archive_matcher();
    for pattern_index in 0..ARCHIVE_PATTERNS.len() {
        if let Some(name) = names
            .iter()
            .find(|name| matcher.matches(name).contains(&pattern_index))
        {
            return Ok(install.join(name));
        }
    }

    Err(LocateError::ArchiveNotFound {
        dir: install.to_path_buf(),
    })
}

fn archive_matcher() -> &'static GlobSet {
    static MATCHER: OnceLock<GlobSet> = OnceLock::new();
    MATCHER.get_or_init(|| {
        let mut builder = GlobSetBuilder::new();
        for pattern in ARCHIVE_PATTERNS {
            builder.add(Glob::new(pattern).expect("archive patterns are valid globs"));
        }
        builder.build().expect("archive glob set builds")
    })
}
