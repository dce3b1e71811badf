use crispyloaf::config::{ConfigError, Settings};
use crispyloaf::doctor;

fn main() {
    let command = std::env::args().nth(1);
    if !matches!(command.as_deref(), None | Some("doctor")) {
        eprintln!("usage: crispyloaf [doctor]");
        std::process::exit(2);
    }

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            if let ConfigError::ValidationError(_) | ConfigError::ParseError(_) = &e {
                if let Ok(path) = Settings::config_path() {
                    eprintln!("\nFix the config file at: {}", path.display());
                }
                eprintln!("\nExample config.toml:");
                eprintln!(
                    r#"
[account]
username = "you@example.com"
password = "secret"

[playback]
video_quality = "720p"
hide_clips = true
"#
                );
            }
            std::process::exit(1);
        }
    };

    let log = crispyloaf::logging::dispatch(&settings.logging);
    let results = tracing::dispatcher::with_default(&log, || doctor::run_checks(&settings));
    print!("{}", doctor::report(&results));

    if results
        .iter()
        .any(|r| r.status == doctor::CheckStatus::Error)
    {
        std::process::exit(1);
    }
}
