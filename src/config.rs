use std::env;
use std::path::{Path, PathBuf};

use clap::Parser;

pub const APP_NAME: &str = "Countdown Timer";
pub const ROOT_ENV: &str = "COUNTDOWN_TIMER_ROOT";

const SETTINGS_FILE: &str = "user_settings.json";
const LOG_FILE: &str = "countdown-timer.log";
const TICK_SOUND: &str = "assets/audio/tick_sounds/DefaultTickSound.mp3";
const ALARM_SOUND: &str = "assets/audio/alarm_sounds/DefaultAlarmSound.mp3";

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Countdown timer with tick sounds and a looping alarm")]
pub struct Args {
    /// Application root holding the settings file and the bundled assets
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Settings file location (default: <root>/user_settings.json)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Log file location (default: <root>/countdown-timer.log)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Prefill the duration entry, e.g. "00:05:00"
    #[arg(short, long)]
    pub duration: Option<String>,
}

/// Resolved filesystem locations for one run of the app.
#[derive(Debug, Clone, PartialEq)]
pub struct AppPaths {
    pub root: PathBuf,
    pub settings: PathBuf,
    pub log_file: PathBuf,
    pub tick_sound: PathBuf,
    pub alarm_sound: PathBuf,
}

impl AppPaths {
    pub fn from_root(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            settings: root.join(SETTINGS_FILE),
            log_file: root.join(LOG_FILE),
            tick_sound: root.join(TICK_SOUND),
            alarm_sound: root.join(ALARM_SOUND),
        }
    }

    pub fn resolve(args: &Args) -> Self {
        let root = args
            .root
            .clone()
            .or_else(|| env::var_os(ROOT_ENV).map(PathBuf::from))
            .unwrap_or_else(exe_dir);
        let mut paths = Self::from_root(&root);
        if let Some(settings) = &args.settings {
            paths.settings = settings.clone();
        }
        if let Some(log_file) = &args.log_file {
            paths.log_file = log_file.clone();
        }
        paths
    }
}

fn exe_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
