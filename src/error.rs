use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::host::HostError;
use crate::router::RouteError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no video started playing after {attempts} checks")]
    PlaybackTimeout { attempts: u32 },
    #[error("stopped waiting for playback")]
    PlaybackCancelled,
}
