use clap::Parser;
use std::path::PathBuf;
use tracing::warn;
use ytdl_core::{
    load_preferences, preferences::default_preferences_path, socket_io::DEFAULT_HOST, Endpoint,
    Preferences, DEFAULT_ACTIVITY_EVENT, DEFAULT_PORT,
};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "ytdl-shell",
    version,
    about = "Terminal dashboard for a yt-dlp WebUI backend"
)]
pub struct Args {
    /// Backend host for this session only; the stored preference is left untouched.
    #[arg(long, env = "YTDL_SERVER_ADDR")]
    pub server_addr: Option<String>,
    #[arg(long, env = "YTDL_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    #[arg(long, env = "YTDL_PREFERENCES")]
    pub preferences: Option<PathBuf>,
    /// Push event that reports whether a download job is running.
    #[arg(long, env = "YTDL_ACTIVITY_EVENT", default_value = DEFAULT_ACTIVITY_EVENT)]
    pub activity_event: String,
    /// Initial route (`/` or `/settings`).
    #[arg(long, default_value = "/")]
    pub route: String,
    #[arg(long, env = "YTDL_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_address: String,
    pub port: u16,
    pub preferences_path: PathBuf,
    pub activity_event: String,
    pub initial_route: String,
}

impl Config {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.server_address.as_str(), self.port)
    }
}

pub fn load_config(args: &Args) -> Config {
    let preferences_path = args
        .preferences
        .clone()
        .unwrap_or_else(default_preferences_path);
    let preferences = match load_preferences(&preferences_path) {
        Ok(preferences) => preferences,
        Err(err) => {
            warn!("preferences_load_error: {err}");
            Preferences::default()
        }
    };
    let activity_event = match args.activity_event.trim() {
        "" => DEFAULT_ACTIVITY_EVENT.to_string(),
        name => name.to_string(),
    };
    Config {
        server_address: resolve_server_address(args.server_addr.as_deref(), &preferences),
        port: args.port,
        preferences_path,
        activity_event,
        initial_route: args.route.clone(),
    }
}

fn resolve_server_address(override_addr: Option<&str>, preferences: &Preferences) -> String {
    override_addr
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or_else(|| preferences.server_addr())
        .unwrap_or(DEFAULT_HOST)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use ytdl_core::save_preferences;

    fn args_with(prefs: PathBuf, extra: &[&str]) -> Args {
        let mut argv = vec![
            "ytdl-shell".to_string(),
            "--preferences".to_string(),
            prefs.to_string_lossy().to_string(),
        ];
        argv.extend(extra.iter().map(|value| value.to_string()));
        Args::try_parse_from(argv).expect("args")
    }

    #[test]
    fn no_preference_connects_to_localhost() {
        let dir = TempDir::new().expect("tempdir");
        let config = load_config(&args_with(dir.path().join("prefs.json"), &[]));
        assert_eq!(config.server_address, "localhost");
        assert_eq!(config.endpoint().to_string(), "localhost:3022");
        assert_eq!(config.activity_event, DEFAULT_ACTIVITY_EVENT);
        assert_eq!(config.initial_route, "/");
    }

    #[test]
    fn stored_preference_selects_endpoint() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("prefs.json");
        save_preferences(
            &path,
            &Preferences {
                server_addr: Some("192.168.1.5".to_string()),
            },
        )
        .expect("save");
        let config = load_config(&args_with(path, &[]));
        assert_eq!(config.endpoint().to_string(), "192.168.1.5:3022");
    }

    #[test]
    fn session_override_wins_over_preference() {
        let prefs = Preferences {
            server_addr: Some("192.168.1.5".to_string()),
        };
        assert_eq!(resolve_server_address(Some("nas.lan"), &prefs), "nas.lan");
        assert_eq!(resolve_server_address(Some("  "), &prefs), "192.168.1.5");
        assert_eq!(
            resolve_server_address(None, &Preferences::default()),
            "localhost"
        );
    }

    #[test]
    fn malformed_preferences_fall_back_to_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "not json").expect("write");
        let config = load_config(&args_with(path, &["--port", "4000"]));
        assert_eq!(config.endpoint().to_string(), "localhost:4000");
    }
}
