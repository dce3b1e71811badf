//! Maps add-on paths onto helper operations.

use std::fmt;
use thiserror::Error;
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, Instrument, debug, info_span};

use crate::api::{MediaApi, MediaType};
use crate::error::Error;
use crate::helper::{Helper, Playback};
use crate::host::{Host, ListItem};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    #[error("no route matches {0}")]
    NoMatch(String),
    #[error("invalid path segment in {0}")]
    BadSegment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/` and `/categories/`
    Index,
    /// `/category/{category}/`
    Category(String),
    /// `/series/{series_id}/`
    Series(String),
    /// `/episode/{media_id}/`
    Episode(String),
    /// `/queue/`, `/queue/anime/`, `/queue/drama/`
    Queue(Vec<MediaType>),
}

impl Route {
    pub fn parse(path: &str) -> Result<Route, RouteError> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let decode = |segment: &str| {
            urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .map_err(|_| RouteError::BadSegment(path.to_string()))
        };

        match segments.as_slice() {
            [] | ["categories"] => Ok(Route::Index),
            ["category", category] => Ok(Route::Category(decode(*category)?)),
            ["series", series_id] => Ok(Route::Series(decode(*series_id)?)),
            ["episode", media_id] => Ok(Route::Episode(decode(*media_id)?)),
            ["queue"] => Ok(Route::Queue(MediaType::ALL.to_vec())),
            ["queue", "anime"] => Ok(Route::Queue(vec![MediaType::Anime])),
            ["queue", "drama"] => Ok(Route::Queue(vec![MediaType::Drama])),
            _ => Err(RouteError::NoMatch(path.to_string())),
        }
    }

    /// Canonical path for this route
    pub fn url(&self) -> String {
        match self {
            Route::Index => "/".to_string(),
            Route::Category(category) => format!("/category/{}/", urlencoding::encode(category)),
            Route::Series(series_id) => format!("/series/{}/", urlencoding::encode(series_id)),
            Route::Episode(media_id) => format!("/episode/{}/", urlencoding::encode(media_id)),
            Route::Queue(types) => match types.as_slice() {
                [single] => format!("/queue/{}/", single.tag()),
                _ => "/queue/".to_string(),
            },
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// What a route hands back to the host
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Items(Vec<ListItem>),
    Playback(Playback),
}

pub struct Router<A, H> {
    helper: Helper<A, H>,
    log: Dispatch,
}

impl<A: MediaApi, H: Host> Router<A, H> {
    /// `log` receives every event emitted while a request is handled
    pub fn new(helper: Helper<A, H>, log: Dispatch) -> Self {
        Self { helper, log }
    }

    pub fn helper(&self) -> &Helper<A, H> {
        &self.helper
    }

    pub fn helper_mut(&mut self) -> &mut Helper<A, H> {
        &mut self.helper
    }

    /// Parse a host path and run the matching route
    pub async fn handle(&self, path: &str) -> Result<Response, Error> {
        let span = tracing::dispatcher::with_default(&self.log, || info_span!("route", path));
        let route = Route::parse(path)?;
        self.dispatch(route)
            .instrument(span)
            .with_subscriber(self.log.clone())
            .await
    }

    pub async fn dispatch(&self, route: Route) -> Result<Response, Error> {
        debug!(%route, "dispatching");
        match route {
            Route::Index => Ok(Response::Items(self.helper.list_categories())),
            Route::Category(category) => self.helper.list_series(&category).await.map(Response::Items),
            Route::Series(series_id) => self.helper.list_episodes(&series_id).await.map(Response::Items),
            Route::Episode(media_id) => self.helper.play_episode(&media_id).await.map(Response::Playback),
            Route::Queue(types) => self.helper.list_queue(&types).await.map(Response::Items),
        }
    }
}
