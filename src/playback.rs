use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::Error;
use crate::host::Host;

/// How long to wait for the host player to report that playback started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            attempts: 30,
        }
    }
}

/// Poll the host until it reports playing.
///
/// Checks once per interval, up to `attempts` times. Returns early with
/// [`Error::PlaybackCancelled`] if `cancel` fires.
pub async fn wait_for_playing<H: Host>(
    host: &H,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    for attempt in 0..policy.attempts {
        if host.is_playing() {
            debug!(attempt, "player started");
            return Ok(());
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(attempt, "wait for playback cancelled");
                return Err(Error::PlaybackCancelled);
            }
            _ = tokio::time::sleep(policy.interval) => {}
        }
    }

    error!(attempts = policy.attempts, "no video started playing");
    Err(Error::PlaybackTimeout {
        attempts: policy.attempts,
    })
}

/// Wait for playback and hand the subtitle file to the player
pub async fn attach_subtitles<H: Host>(
    host: &H,
    subtitle_file: &Path,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    wait_for_playing(host, policy, cancel).await?;
    info!(path = %subtitle_file.display(), "attaching subtitles");
    host.set_subtitles(subtitle_file);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostError, PlaybackResult};
    use std::cell::Cell;
    use std::sync::Mutex;

    /// Reports playing after `starts_after` status checks
    struct SlowPlayer {
        starts_after: Option<u32>,
        checks: Cell<u32>,
        subtitles: Mutex<Vec<std::path::PathBuf>>,
    }

    impl SlowPlayer {
        fn new(starts_after: Option<u32>) -> Self {
            Self {
                starts_after,
                checks: Cell::new(0),
                subtitles: Mutex::new(Vec::new()),
            }
        }
    }

    impl Host for SlowPlayer {
        fn notify(&self, _message: &str) {}

        fn redirect(&self, _path: &str) {}

        fn play(&self, _item: &PlaybackResult) -> Result<(), HostError> {
            Ok(())
        }

        fn is_playing(&self) -> bool {
            let checks = self.checks.get() + 1;
            self.checks.set(checks);
            self.starts_after.is_some_and(|n| checks > n)
        }

        fn set_subtitles(&self, path: &Path) {
            self.subtitles.lock().unwrap().push(path.to_path_buf());
        }
    }

    fn fast(attempts: u32) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            attempts,
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(1));
        assert_eq!(policy.attempts, 30);
    }

    #[tokio::test]
    async fn test_returns_once_playing() {
        let player = SlowPlayer::new(Some(3));
        wait_for_playing(&player, fast(10), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(player.checks.get(), 4);
    }

    #[tokio::test]
    async fn test_times_out_after_budget() {
        let player = SlowPlayer::new(None);
        let err = wait_for_playing(&player, fast(5), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PlaybackTimeout { attempts: 5 }));
        assert_eq!(player.checks.get(), 5);
    }

    #[tokio::test]
    async fn test_cancelled_wait() {
        let player = SlowPlayer::new(None);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let policy = PollPolicy {
            interval: Duration::from_secs(60),
            attempts: 30,
        };
        let err = wait_for_playing(&player, policy, &cancel).await.unwrap_err();
        assert!(matches!(err, Error::PlaybackCancelled));
        assert_eq!(player.checks.get(), 1);
    }

    #[tokio::test]
    async fn test_attach_subtitles_after_start() {
        let player = SlowPlayer::new(Some(1));
        attach_subtitles(
            &player,
            Path::new("/tmp/cr_1_2.ass"),
            fast(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(
            *player.subtitles.lock().unwrap(),
            vec![std::path::PathBuf::from("/tmp/cr_1_2.ass")]
        );
    }

    #[tokio::test]
    async fn test_attach_subtitles_not_called_on_timeout() {
        let player = SlowPlayer::new(None);
        let result = attach_subtitles(
            &player,
            Path::new("/tmp/cr_1_2.ass"),
            fast(2),
            &CancellationToken::new(),
        )
        .await;
        assert!(result.is_err());
        assert!(player.subtitles.lock().unwrap().is_empty());
    }
}
