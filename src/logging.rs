use std::fs::{self, OpenOptions};
use std::path::Path;

use crate::config::LogSettings;

/// Route `log` records to `path`, never the terminal the game draws on.
///
/// `RUST_LOG` wins over `settings.level`. If the file cannot be opened,
/// logging stays off.
pub fn init(settings: &LogSettings, path: &Path) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        let _ = fs::create_dir_all(parent);
    }
    let file = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => f,
        Err(_) => return,
    };

    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.level.as_str()),
    )
    .filter_module("rustls", log::LevelFilter::Warn)
    .filter_module("symphonia", log::LevelFilter::Warn)
    .target(env_logger::Target::Pipe(Box::new(file)))
    .try_init();
}
