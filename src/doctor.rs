//! `crispyloaf doctor`: sanity checks for a local install.

use std::fmt::Write;
use std::path::Path;

use itertools::Itertools;
use tracing::debug;

use crate::api::StreamFormat;
use crate::config::Settings;
use crate::helper::API_STATE_KEY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckStatus {
    /// Colored tag shown in front of each check
    fn tag(self) -> &'static str {
        match self {
            CheckStatus::Ok => "\x1b[32m ok \x1b[0m",
            CheckStatus::Warning => "\x1b[33mwarn\x1b[0m",
            CheckStatus::Error => "\x1b[31mfail\x1b[0m",
        }
    }
}

#[derive(Debug)]
pub struct CheckResult {
    pub check: &'static str,
    pub status: CheckStatus,
    pub message: String,
}

impl CheckResult {
    fn new(status: CheckStatus, check: &'static str, message: impl Into<String>) -> Self {
        Self {
            check,
            status,
            message: message.into(),
        }
    }
}

pub fn run_checks(settings: &Settings) -> Vec<CheckResult> {
    let results = vec![
        check_account(settings),
        check_quality(settings),
        check_state_file(&settings.storage.state_file()),
        check_temp_dir(&settings.storage.temp_dir()),
    ];
    debug!(checks = results.len(), "doctor finished");
    results
}

fn check_account(settings: &Settings) -> CheckResult {
    match settings.account.credentials() {
        Some((username, _)) => CheckResult::new(CheckStatus::Ok, "account", format!("logging in as {}", username)),
        None => CheckResult::new(
            CheckStatus::Warning,
            "account",
            "no credentials configured, only free episodes are listed",
        ),
    }
}

fn check_quality(settings: &Settings) -> CheckResult {
    let tag = &settings.playback.video_quality;
    let Some(format) = StreamFormat::for_tag(tag) else {
        let fallback = StreamFormat::DEFAULT;
        return CheckResult::new(
            CheckStatus::Warning,
            "quality",
            format!(
                "unknown quality '{}', streams use format {}/{}",
                tag, fallback.format, fallback.quality
            ),
        );
    };
    CheckResult::new(
        CheckStatus::Ok,
        "quality",
        format!("{} is format {}/{}", tag, format.format, format.quality),
    )
}

fn check_state_file(path: &Path) -> CheckResult {
    let shown = path.display();
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return CheckResult::new(CheckStatus::Ok, "state", format!("{} will be created on first listing", shown));
        }
        Err(e) => return CheckResult::new(CheckStatus::Error, "state", format!("cannot read {}: {}", shown, e)),
    };

    match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&contents) {
        Ok(entries) if entries.contains_key(API_STATE_KEY) => {
            CheckResult::new(CheckStatus::Ok, "state", format!("session saved in {}", shown))
        }
        Ok(_) => CheckResult::new(CheckStatus::Ok, "state", format!("no session in {}", shown)),
        Err(e) => CheckResult::new(
            CheckStatus::Error,
            "state",
            format!("{} is not a JSON object ({}), it will be reset", shown, e),
        ),
    }
}

fn check_temp_dir(temp_dir: &Path) -> CheckResult {
    let scratch_file = temp_dir.join(".crispyloaf_write_check");
    let writable = std::fs::create_dir_all(temp_dir)
        .and_then(|_| std::fs::write(&scratch_file, b""))
        .and_then(|_| std::fs::remove_file(&scratch_file));

    match writable {
        Ok(()) => CheckResult::new(CheckStatus::Ok, "subtitles", format!("cached in {}", temp_dir.display())),
        Err(e) => CheckResult::new(
            CheckStatus::Error,
            "subtitles",
            format!("{} is not writable: {}", temp_dir.display(), e),
        ),
    }
}

/// Render the check list followed by a one-line verdict
pub fn report(results: &[CheckResult]) -> String {
    let mut out = String::from("crispyloaf doctor\n\n");
    for result in results {
        let _ = writeln!(out, "[{}] {:<10} {}", result.status.tag(), result.check, result.message);
    }

    let counts = results.iter().counts_by(|r| r.status);
    let failed = counts.get(&CheckStatus::Error).copied().unwrap_or(0);
    let warned = counts.get(&CheckStatus::Warning).copied().unwrap_or(0);
    let verdict = match (failed, warned) {
        (0, 0) => "ready to play".to_string(),
        (0, w) => format!("{} warning(s), free episodes will still play", w),
        (f, w) => format!("{} failing check(s), {} warning(s)", f, w),
    };
    let _ = writeln!(out, "\n{}", verdict);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("crispyloaf-doctor-{}-{}", std::process::id(), name));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_unknown_quality_warns() {
        let mut settings = Settings::default();
        settings.playback.video_quality = "4k".into();
        assert_eq!(check_quality(&settings).status, CheckStatus::Warning);

        settings.playback.video_quality = "720p".into();
        assert_eq!(check_quality(&settings).status, CheckStatus::Ok);
    }

    #[test]
    fn test_anonymous_account_warns() {
        assert_eq!(check_account(&Settings::default()).status, CheckStatus::Warning);
    }

    #[test]
    fn test_state_file_checks() {
        let dir = scratch("state");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("storage.json");

        assert_eq!(check_state_file(&path).status, CheckStatus::Ok);

        std::fs::write(&path, r#"{"api_state": {"session_id": "x"}}"#).unwrap();
        let result = check_state_file(&path);
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.message.contains("session saved"));

        std::fs::write(&path, "[1, 2]").unwrap();
        assert_eq!(check_state_file(&path).status, CheckStatus::Error);
    }

    #[test]
    fn test_temp_dir_is_created() {
        let dir = scratch("temp");
        assert_eq!(check_temp_dir(&dir).status, CheckStatus::Ok);
        assert!(dir.exists());
    }

    #[test]
    fn test_report_verdict_counts_statuses() {
        let results = vec![
            CheckResult::new(CheckStatus::Ok, "account", "logging in as alice"),
            CheckResult::new(CheckStatus::Warning, "quality", "unknown quality '4k'"),
            CheckResult::new(CheckStatus::Error, "state", "cannot read storage.json"),
        ];
        let text = report(&results);
        assert!(text.contains("account    logging in as alice"));
        assert!(text.trim_end().ends_with("1 failing check(s), 1 warning(s)"));

        let text = report(&results[..2]);
        assert!(text.trim_end().ends_with("1 warning(s), free episodes will still play"));

        assert!(report(&results[..1]).trim_end().ends_with("ready to play"));
    }
}
