//! crispyloaf - browse and play anime and drama episodes from a streaming
//! service inside a media-center host.
//!
//! The host calls [`Router::handle`] with an add-on path such as
//! `/category/anime/` and renders the returned [`Response`]. The streaming
//! service client and the host itself are supplied by the embedder through
//! the [`MediaApi`] and [`Host`] traits.

pub mod api;
pub mod config;
pub mod doctor;
pub mod error;
pub mod helper;
pub mod host;
pub mod logging;
pub mod playback;
pub mod router;
pub mod storage;
pub mod subtitles;

pub use api::{ApiError, Media, MediaApi, MediaStream, MediaType, RtmpData, Series, SortOrder, StreamFormat, SubtitleTrack};
pub use config::{ConfigError, Settings};
pub use error::Error;
pub use helper::{API_STATE_KEY, Category, Helper, Playback, RedirectReason};
pub use host::{Host, HostError, ListItem, PlaybackResult};
pub use router::{Response, Route, RouteError, Router};
pub use storage::JsonStorage;
