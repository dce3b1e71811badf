//! On-disk cache of decrypted subtitle tracks.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::api::ApiError;
use crate::error::Error;

/// Held while one key is fetched and written
type Guard = Arc<tokio::sync::Mutex<()>>;

/// Caches subtitle files as `cr_{media_id}_{subtitle_id}.ass` in a directory.
///
/// Both ids are percent-encoded (`_` included), so distinct keys never share
/// a file. Files are never refreshed once written, but a file removed from
/// disk is fetched again. Concurrent requests for the same key share a
/// single fetch.
#[derive(Debug)]
pub struct SubtitleCache {
    dir: PathBuf,
    guards: Mutex<HashMap<(String, String), Guard>>,
}

impl SubtitleCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            guards: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, media_id: &str, subtitle_id: &str) -> PathBuf {
        let name = format!("cr_{}_{}.ass", encode_id(media_id), encode_id(subtitle_id));
        self.dir.join(name)
    }

    /// Return the cached file for this key, running `fetch` to create it if
    /// it does not exist on disk.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        media_id: &str,
        subtitle_id: &str,
        fetch: F,
    ) -> Result<PathBuf, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, ApiError>>,
    {
        let path = self.path_for(media_id, subtitle_id);
        if tokio::fs::try_exists(&path).await? {
            debug!(path = %path.display(), "subtitle cache hit");
            return Ok(path);
        }

        let guard = self.guard(media_id, subtitle_id);
        let _held = guard.lock().await;

        // another request may have written it while we waited
        if tokio::fs::try_exists(&path).await? {
            debug!(path = %path.display(), "subtitle cache hit after wait");
            return Ok(path);
        }

        let contents = fetch().await?;
        tokio::fs::create_dir_all(&self.dir).await?;

        // readers only ever see a complete file
        let partial = path.with_extension("ass.tmp");
        tokio::fs::write(&partial, contents).await?;
        if let Err(e) = tokio::fs::rename(&partial, &path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }

        info!(media_id, subtitle_id, path = %path.display(), "cached subtitles");
        Ok(path)
    }

    fn guard(&self, media_id: &str, subtitle_id: &str) -> Guard {
        let mut guards = self.guards.lock().unwrap_or_else(|e| e.into_inner());
        guards
            .entry((media_id.to_string(), subtitle_id.to_string()))
            .or_default()
            .clone()
    }
}

fn encode_id(id: &str) -> String {
    urlencoding::encode(id).replace('_', "%5F")
}
