use std::fs::File;

use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Build the log sink handed to the router.
///
/// Writes to the configured file when it can be created, otherwise stderr.
/// `RUST_LOG` overrides the configured level. Nothing is installed globally.
pub fn dispatch(config: &LoggingConfig) -> Dispatch {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
    };

    let log_file = config.file.as_ref().and_then(|path| {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        File::create(path).ok()
    });

    match log_file {
        Some(file) => Dispatch::new(
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_target(false)
                .with_ansi(false)
                .with_writer(file)
                .finish(),
        ),
        None => Dispatch::new(
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_target(false)
                .with_writer(std::io::stderr)
                .finish(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sink_receives_events() {
        let path = std::env::temp_dir().join(format!("crispyloaf-log-{}.log", std::process::id()));
        let config = LoggingConfig {
            level: "debug".to_string(),
            file: Some(path.clone()),
        };

        let log = dispatch(&config);
        tracing::dispatcher::with_default(&log, || {
            tracing::error!(media_id = "589", "hello from test");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("hello from test"));
        assert!(contents.contains("media_id=\"589\""));
    }
}
