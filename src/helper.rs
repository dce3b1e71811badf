//! Turns navigation requests into API calls and API records into host items.

use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::{Media, MediaApi, MediaStream, MediaType, Series, SortOrder, StreamFormat};
use crate::config::{PlaybackConfig, Settings};
use crate::error::Error;
use crate::host::{Host, ListItem, PlaybackResult};
use crate::playback::{PollPolicy, attach_subtitles};
use crate::router::Route;
use crate::storage::JsonStorage;
use crate::subtitles::SubtitleCache;

/// Storage key for the API client's session state
pub const API_STATE_KEY: &str = "api_state";

/// Browsable series categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Anime,
    Drama,
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anime" => Ok(Category::Anime),
            "drama" => Ok(Category::Drama),
            other => Err(Error::UnknownCategory(other.to_string())),
        }
    }
}

/// Whether an operation writes the API session state back to storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateHook {
    Save,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    /// Content needs a paid tier
    Upsell,
    /// Stream descriptor had no RTMP data
    NoStream,
}

impl RedirectReason {
    fn message(self) -> &'static str {
        match self {
            RedirectReason::Upsell => "This episode requires a premium membership",
            RedirectReason::NoStream => "No stream is available for this episode",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Playback {
    Started {
        item: PlaybackResult,
        subtitles: Option<PathBuf>,
    },
    Redirected {
        to: String,
        reason: RedirectReason,
    },
}

pub struct Helper<A, H> {
    api: A,
    host: H,
    storage: JsonStorage,
    playback: PlaybackConfig,
    subtitles: SubtitleCache,
    cancel: Mutex<CancellationToken>,
}

impl<A: MediaApi, H: Host> Helper<A, H> {
    pub async fn new(api: A, host: H, storage: JsonStorage, settings: &Settings) -> Result<Self, Error> {
        let mut helper = Self {
            api,
            host,
            storage,
            playback: settings.playback.clone(),
            subtitles: SubtitleCache::new(settings.storage.temp_dir()),
            cancel: Mutex::new(CancellationToken::new()),
        };

        helper.restore_state();

        if let Some((username, password)) = settings.account.credentials() {
            info!(username, "logging in");
            helper
                .api
                .login(username, password)
                .await
                .inspect_err(|e| error!(username, error = %e, "login failed"))?;
        }

        Ok(helper)
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn storage(&self) -> &JsonStorage {
        &self.storage
    }

    /// Token that aborts the pending (or next) wait for playback to start.
    ///
    /// A cancelled token is replaced once the playback request that observed
    /// it finishes, so later requests are unaffected.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn list_categories(&self) -> Vec<ListItem> {
        vec![
            ListItem::folder("Anime", Route::Category("anime".into()).url()),
            ListItem::folder("Drama", Route::Category("drama".into()).url()),
            ListItem::folder("Queue", Route::Queue(MediaType::ALL.to_vec()).url()),
        ]
    }

    pub async fn list_series(&self, category: &str) -> Result<Vec<ListItem>, Error> {
        let category: Category = category.parse()?;
        self.stateful(StateHook::Save, self.fetch_series(category)).await
    }

    pub async fn list_episodes(&self, series_id: &str) -> Result<Vec<ListItem>, Error> {
        self.stateful(StateHook::Save, async {
            let media = self
                .api
                .list_media(series_id, SortOrder::Asc)
                .await
                .inspect_err(|e| error!(series_id, error = %e, "failed to list episodes"))?;
            let total = media.len();
            let items: Vec<ListItem> = media
                .iter()
                .filter(|m| self.is_listable(m))
                .map(episode_item)
                .collect();
            debug!(series_id, total, shown = items.len(), "listed episodes");
            Ok::<_, Error>(items)
        })
        .await
    }

    pub async fn list_queue(&self, media_types: &[MediaType]) -> Result<Vec<ListItem>, Error> {
        self.stateful(StateHook::Save, async {
            let media_types = MediaType::join(media_types);
            let queue = self
                .api
                .list_queue(&media_types)
                .await
                .inspect_err(|e| error!(%media_types, error = %e, "failed to list queue"))?;
            Ok::<_, Error>(queue.iter().map(series_item).collect())
        })
        .await
    }

    pub async fn play_episode(&self, media_id: &str) -> Result<Playback, Error> {
        // Playback has never written session state back. This may be an
        // oversight upstream; it stays disabled until confirmed.
        self.stateful(StateHook::Skip, self.resolve_and_play(media_id))
            .await
    }

    /// Forget the persisted API session state
    pub fn clear_state(&mut self) -> Result<(), Error> {
        self.api.set_state(serde_json::Value::Null);
        self.storage.remove(API_STATE_KEY)?;
        info!("cleared api state");
        Ok(())
    }

    /// An episode is listed only if it passes every gate
    pub fn is_listable(&self, media: &Media) -> bool {
        if self.playback.hide_clips && media.episode_number().is_none() {
            return false;
        }
        if !media.premium_available {
            return false;
        }
        if !self.api.is_premium(media.media_type) && !media.free_available {
            return false;
        }
        true
    }

    /// Write the cached subtitle file for this stream, if it has a default track
    pub async fn resolve_subtitles(
        &self,
        stream: &MediaStream,
        media_id: &str,
    ) -> Result<Option<PathBuf>, Error> {
        let Some(track) = &stream.default_subtitles else {
            debug!(media_id, "stream has no default subtitles");
            return Ok(None);
        };

        let path = self
            .subtitles
            .get_or_fetch(media_id, &track.id, || self.api.fetch_subtitles(track))
            .await
            .inspect_err(|e| error!(media_id, subtitle_id = %track.id, error = %e, "failed to resolve subtitles"))?;

        Ok(Some(path))
    }

    async fn fetch_series(&self, category: Category) -> Result<Vec<ListItem>, Error> {
        let series = match category {
            Category::Anime => self.api.list_anime_series(SortOrder::Alpha).await,
            Category::Drama => self.api.list_drama_series(SortOrder::Alpha).await,
        }
        .inspect_err(|e| error!(?category, error = %e, "failed to list series"))?;
        debug!(?category, count = series.len(), "listed series");
        Ok(series.iter().map(series_item).collect())
    }

    async fn resolve_and_play(&self, media_id: &str) -> Result<Playback, Error> {
        let format = self.stream_format(media_id).await?;

        let stream = self
            .api
            .get_media_stream(media_id, format)
            .await
            .inspect_err(|e| {
                error!(
                    media_id,
                    format = format.format,
                    quality = format.quality,
                    error = %e,
                    "failed to fetch stream"
                )
            })?;

        if stream.is_upsell {
            return Ok(self.redirect_home(media_id, RedirectReason::Upsell));
        }

        let Some(rtmp) = &stream.rtmp_data else {
            return Ok(self.redirect_home(media_id, RedirectReason::NoStream));
        };

        let item = PlaybackResult::new(stream.episode_title.clone(), rtmp.stream_url());
        let subtitles = self.resolve_subtitles(&stream, media_id).await?;

        info!(
            media_id,
            label = %item.label,
            format = format.format,
            quality = format.quality,
            subtitles = ?subtitles,
            "playing episode"
        );
        self.host
            .play(&item)
            .inspect_err(|e| error!(media_id, error = %e, "host failed to start playback"))?;

        if let Some(path) = &subtitles {
            let cancel = self.cancellation();
            let attached = attach_subtitles(&self.host, path, self.poll_policy(), &cancel).await;
            self.renew_cancellation(&cancel);
            attached.inspect_err(|e| error!(media_id, error = %e, "failed to attach subtitles"))?;
        }

        Ok(Playback::Started { item, subtitles })
    }

    /// Preferred (format, quality), or the service default when not offered
    async fn stream_format(&self, media_id: &str) -> Result<StreamFormat, Error> {
        let tag = self.playback.video_quality.as_str();
        let formats = self
            .api
            .get_stream_formats(media_id)
            .await
            .inspect_err(|e| error!(media_id, quality = tag, error = %e, "failed to list stream formats"))?;

        match formats.get(tag) {
            Some(format) => Ok(*format),
            None => {
                let available: Vec<&String> = formats.keys().collect();
                error!(
                    media_id,
                    quality = tag,
                    ?available,
                    "preferred quality not offered, falling back to default"
                );
                Ok(StreamFormat::DEFAULT)
            }
        }
    }

    fn redirect_home(&self, media_id: &str, reason: RedirectReason) -> Playback {
        warn!(media_id, ?reason, "episode not playable");
        let to = Route::Index.url();
        self.host.notify(reason.message());
        self.host.redirect(&to);
        Playback::Redirected { to, reason }
    }

    /// Swap in a fresh token once a cancelled one has been consumed
    fn renew_cancellation(&self, used: &CancellationToken) {
        if !used.is_cancelled() {
            return;
        }
        let mut current = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
        if current.is_cancelled() {
            *current = CancellationToken::new();
        }
    }

    fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: self.playback.poll_interval(),
            attempts: self.playback.poll_attempts,
        }
    }

    /// Run `op`, then persist the API session state if `hook` asks for it
    /// and the operation succeeded.
    async fn stateful<T>(
        &self,
        hook: StateHook,
        op: impl Future<Output = Result<T, Error>>,
    ) -> Result<T, Error> {
        let result = op.await;
        if hook == StateHook::Save && result.is_ok() {
            self.save_state();
        }
        result
    }

    fn save_state(&self) {
        if let Err(e) = self.storage.set(API_STATE_KEY, self.api.get_state()) {
            error!(error = %e, "failed to persist api state");
        }
    }

    fn restore_state(&self) {
        // Loaded but not handed to the client, which starts a fresh session.
        match self.storage.get(API_STATE_KEY) {
            Some(_) => debug!("found persisted api state, not restoring"),
            None => debug!("no persisted api state"),
        }
    }
}

fn series_item(series: &Series) -> ListItem {
    ListItem::folder(
        series.name.clone(),
        Route::Series(series.series_id.clone()).url(),
    )
}

fn episode_item(media: &Media) -> ListItem {
    let label = match media.episode_number() {
        Some(number) => format!("E{:02} - {}", number, media.name),
        None => media.name.clone(),
    };
    ListItem::folder(label, Route::Episode(media.media_id.clone()).url())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(number: Option<&str>) -> Media {
        Media {
            media_id: "589".into(),
            name: "The Boy in the Iceberg".into(),
            episode_number: number.map(String::from),
            media_type: MediaType::Anime,
            free_available: true,
            premium_available: true,
        }
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("anime".parse::<Category>().unwrap(), Category::Anime);
        assert_eq!("drama".parse::<Category>().unwrap(), Category::Drama);
        assert!(matches!(
            "music".parse::<Category>(),
            Err(Error::UnknownCategory(c)) if c == "music"
        ));
    }

    #[test]
    fn test_episode_item_label_and_path() {
        let item = episode_item(&media(Some("3")));
        assert_eq!(item.label, "E03 - The Boy in the Iceberg");
        assert_eq!(item.path, "/episode/589/");
        assert!(!item.is_playable);

        let item = episode_item(&media(Some("112")));
        assert_eq!(item.label, "E112 - The Boy in the Iceberg");
    }

    #[test]
    fn test_episode_item_without_number() {
        let item = episode_item(&media(None));
        assert_eq!(item.label, "The Boy in the Iceberg");
    }

    #[test]
    fn test_series_item() {
        let item = series_item(&Series {
            series_id: "271".into(),
            name: "Avatar".into(),
        });
        assert_eq!(item, ListItem::folder("Avatar", "/series/271/"));
    }

    #[test]
    fn test_redirect_messages_differ() {
        assert_ne!(
            RedirectReason::Upsell.message(),
            RedirectReason::NoStream.message()
        );
    }
}
