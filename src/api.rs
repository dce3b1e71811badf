//! Contract with the external streaming service client.
//!
//! The client owns authentication, session handling and the wire protocol.
//! This module only describes the records it hands back and the calls the
//! add-on makes against it.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    RequestError(String),
    #[error("authentication failed: {0}")]
    AuthError(String),
    #[error("media {0} not found")]
    NotFound(String),
    #[error("failed to decrypt subtitles: {0}")]
    SubtitleError(String),
}

/// Media type tags understood by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Anime,
    Drama,
}

impl MediaType {
    pub const ALL: [MediaType; 2] = [MediaType::Anime, MediaType::Drama];

    pub fn tag(self) -> &'static str {
        match self {
            MediaType::Anime => "anime",
            MediaType::Drama => "drama",
        }
    }

    /// Join tags the way the service expects them: "anime|drama"
    pub fn join(types: &[MediaType]) -> String {
        types.iter().map(|t| t.tag()).join("|")
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anime" => Ok(MediaType::Anime),
            "drama" => Ok(MediaType::Drama),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Alpha,
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Series {
    pub series_id: String,
    pub name: String,
}

/// A single playable item in a series (episode, clip, trailer)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Media {
    pub media_id: String,
    pub name: String,
    /// Service-provided number; empty or non-numeric for clips
    #[serde(default)]
    pub episode_number: Option<String>,
    pub media_type: MediaType,
    #[serde(default)]
    pub free_available: bool,
    #[serde(default)]
    pub premium_available: bool,
}

impl Media {
    /// Episode number as an integer, if the service gave a usable one
    pub fn episode_number(&self) -> Option<u32> {
        self.episode_number.as_deref()?.trim().parse().ok()
    }
}

/// A (format, quality) pair the stream endpoint accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamFormat {
    pub format: u32,
    pub quality: u32,
}

impl StreamFormat {
    /// Used whenever the preferred quality is not offered
    pub const DEFAULT: StreamFormat = StreamFormat {
        format: 106,
        quality: 60,
    };

    /// Known quality tags and their stream parameters
    pub fn for_tag(tag: &str) -> Option<StreamFormat> {
        let (format, quality) = match tag {
            "360p" => (106, 60),
            "480p" => (106, 61),
            "720p" => (106, 62),
            "1080p" => (108, 80),
            _ => return None,
        };
        Some(StreamFormat { format, quality })
    }
}

/// RTMP transport parameters from a stream descriptor
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RtmpData {
    pub url: String,
    pub swf_url: String,
    pub token: String,
    pub file: String,
    pub page_url: String,
}

impl RtmpData {
    /// Build the single-string stream address players understand
    pub fn stream_url(&self) -> String {
        format!(
            "{url} swfurl={swf_url} swfvfy=1 token={token} playpath={file} pageurl={page_url} tcUrl={url}",
            url = self.url,
            swf_url = self.swf_url,
            token = self.token,
            file = self.file,
            page_url = self.page_url,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubtitleTrack {
    pub id: String,
}

/// Stream descriptor for one media item at one (format, quality)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaStream {
    pub episode_title: String,
    /// Set when the content needs a paid tier
    #[serde(default)]
    pub is_upsell: bool,
    pub rtmp_data: Option<RtmpData>,
    pub default_subtitles: Option<SubtitleTrack>,
}

/// Operations the add-on performs against the streaming service client
pub trait MediaApi {
    /// Opaque session state, persisted between invocations
    fn get_state(&self) -> serde_json::Value;

    fn set_state(&mut self, state: serde_json::Value);

    fn login(&mut self, username: &str, password: &str) -> impl Future<Output = Result<(), ApiError>>;

    fn list_anime_series(&self, sort: SortOrder) -> impl Future<Output = Result<Vec<Series>, ApiError>>;

    fn list_drama_series(&self, sort: SortOrder) -> impl Future<Output = Result<Vec<Series>, ApiError>>;

    fn list_media(
        &self,
        series_id: &str,
        sort: SortOrder,
    ) -> impl Future<Output = Result<Vec<Media>, ApiError>>;

    /// Quality tag to stream parameters for everything offered for this media
    fn get_stream_formats(
        &self,
        media_id: &str,
    ) -> impl Future<Output = Result<HashMap<String, StreamFormat>, ApiError>>;

    fn get_media_stream(
        &self,
        media_id: &str,
        format: StreamFormat,
    ) -> impl Future<Output = Result<MediaStream, ApiError>>;

    /// `media_types` is a pipe-delimited tag list, see [`MediaType::join`]
    fn list_queue(&self, media_types: &str) -> impl Future<Output = Result<Vec<Series>, ApiError>>;

    /// Fetch, decrypt and ASS-format a subtitle track
    fn fetch_subtitles(&self, track: &SubtitleTrack) -> impl Future<Output = Result<String, ApiError>>;

    /// Whether the logged-in account has premium access for this media type
    fn is_premium(&self, media_type: MediaType) -> bool;
}
