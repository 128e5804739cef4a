use crate::config;

/// Load settings, falling back to defaults when the file or environment is
/// unusable. Runs before logging is set up, so problems go to stderr.
pub fn load_settings() -> config::Settings {
    match config::Settings::load() {
        Ok(s) => {
            if let Err(msg) = s.validate() {
                eprintln!("tunequiz: invalid config, using defaults: {msg}");
                config::Settings::default()
            } else {
                s
            }
        }
        Err(e) => {
            eprintln!("tunequiz: failed to load config, using defaults: {e}");
            config::Settings::default()
        }
    }
}
