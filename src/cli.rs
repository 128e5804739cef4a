use std::path::PathBuf;

use clap::Parser;

use crate::config::{Backend, Settings};

/// Command-line overrides. Anything left unset falls through to the
/// environment, the config file and then the built-in defaults.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Name the song from a timed snippet", long_about = None)]
pub struct Cli {
    /// Where the tracks come from and play.
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Music directory for the local backend.
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Sign in to Spotify in the browser and cache the token, then exit.
    #[arg(long)]
    pub login: bool,

    /// Re-sync the Spotify saved-tracks cache before playing.
    #[arg(long)]
    pub refresh_library: bool,

    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub snippet_seconds: Option<u32>,

    /// Stop after this many correct answers (0 = unlimited).
    #[arg(long)]
    pub max_rounds: Option<u32>,

    /// Seed the track picker for a reproducible run.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(backend) = self.backend {
            settings.playback.backend = backend;
        }
        if let Some(dir) = &self.dir {
            settings.library.dir = Some(dir.clone());
        }
        if let Some(s) = self.snippet_seconds {
            settings.round.snippet_seconds = s;
        }
        if let Some(n) = self.max_rounds {
            settings.round.max_rounds = n;
        }
        if self.seed.is_some() {
            settings.round.seed = self.seed;
        }
    }
}
