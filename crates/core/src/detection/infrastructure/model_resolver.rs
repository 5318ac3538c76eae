use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
    #[error("model {name} not found in {searched:?}; pass --model-dir or --model-base-url")]
    NotFound { name: String, searched: Vec<PathBuf> },
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Where model files may come from.
#[derive(Clone, Debug, Default)]
pub struct ModelSources {
    /// Directory checked before anything else.
    pub model_dir: Option<PathBuf>,
    /// Overrides the platform cache directory (tests, portable installs).
    pub cache_dir: Option<PathBuf>,
    /// Base URL a missing model is downloaded from, as `{base_url}/{name}`.
    pub base_url: Option<String>,
}

impl ModelSources {
    pub fn new(model_dir: Option<PathBuf>, base_url: Option<String>) -> Self {
        Self {
            model_dir,
            cache_dir: None,
            base_url,
        }
    }

    fn cache_dir(&self) -> Result<PathBuf, ModelResolveError> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => model_cache_dir(),
        }
    }
}

/// Resolve a model file by name.
///
/// Resolution order:
/// 1. Explicit model directory
/// 2. User cache directory (platform-specific)
/// 3. Download from `base_url` into the cache
pub fn resolve(
    name: &str,
    sources: &ModelSources,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let mut searched = Vec::new();

    if let Some(dir) = &sources.model_dir {
        let path = dir.join(name);
        if path.exists() {
            return Ok(path);
        }
        searched.push(dir.clone());
    }

    let cache_dir = sources.cache_dir()?;
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        return Ok(cached_path);
    }
    searched.push(cache_dir.clone());

    let Some(base_url) = &sources.base_url else {
        return Err(ModelResolveError::NotFound {
            name: name.to_string(),
            searched,
        });
    };

    let url = format!("{}/{name}", base_url.trim_end_matches('/'));
    log::info!("Downloading {name} from {url}");
    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    download(&url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Facewatch/models/`
/// - Linux: `$XDG_CACHE_HOME/Facewatch/models/` or `~/.cache/Facewatch/models/`
/// - Windows: `%LOCALAPPDATA%/Facewatch/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("Facewatch").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("Facewatch").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path, progress);

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let write_err = |source: std::io::Error| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source,
    };

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|source| ModelResolveError::Download {
            url: url.to_string(),
            source,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;
    let mut file = fs::File::create(temp_path).map_err(write_err)?;

    // Streamed in 1MB chunks so large models never sit fully in memory.
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(temp_path, dest).map_err(|source| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source,
    })
}
