use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;

use crate::cli::Cli;
use crate::config::{Backend, Settings};
use crate::error::ApiError;
use crate::library::{LibraryProvider, LocalLibrary, SpotifyLibrary, Track};
use crate::logging;
use crate::playback::{LocalPlayback, PlaybackController, SpotifyPlayback};
use crate::round::{CandidateSelector, MonotonicTime, OPTION_COUNT, TerminalKeys};
use crate::score::RunSummary;
use crate::spotify::{Auth, SpotifyClient, auth, http_client};

mod game;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    // Credentials may live in `.env`; a missing file is fine.
    let dotenv = dotenvy::dotenv();
    let mut settings = settings::load_settings();
    cli.apply(&mut settings);

    if cli.print_config {
        print!("{}", toml::to_string_pretty(&settings)?);
        return Ok(());
    }

    logging::init(&settings.log, &settings.log_path());
    log::info!("[Main] starting tunequiz v{}", env!("CARGO_PKG_VERSION"));
    match dotenv {
        Ok(path) => log::debug!("[Main] loaded {}", path.display()),
        Err(e) => log::debug!("[Main] no .env loaded: {e}"),
    }

    if cli.login {
        return Ok(login(&settings)?);
    }

    let summary = match settings.playback.backend {
        Backend::Local => {
            let dir = startup::music_dir(&settings);
            eprintln!("Scanning {} ...", dir.display());
            let tracks = LocalLibrary::new(dir, settings.library.clone()).get_tracks()?;
            let mut playback = LocalPlayback::new();
            play(&settings, tracks, &mut playback)?
        }
        Backend::Spotify => {
            let client = SpotifyClient::new(&settings.spotify, spotify_auth(&settings)?)?;
            let user = client.current_user()?;
            log::info!("[Main] signed in to Spotify as {user}");
            eprintln!("Loading saved tracks for {user} ...");
            let tracks = SpotifyLibrary::new(
                &client,
                settings.library_cache_path(),
                cli.refresh_library,
            )
            .get_tracks()?;
            let mut playback =
                SpotifyPlayback::new(&client, &settings.playback, settings.round.snippet_seconds);
            play(&settings, tracks, &mut playback)?
        }
    };

    if let Some(summary) = summary {
        println!(
            "Final score: {} ({} rounds, {:.0}% correct)",
            summary.score,
            summary.rounds_played,
            summary.accuracy_pct()
        );
    }
    Ok(())
}

/// Take over the terminal for a session and hand it back afterwards, even
/// when the session fails.
fn play(
    settings: &Settings,
    tracks: Vec<Track>,
    playback: &mut dyn PlaybackController,
) -> Result<Option<RunSummary>, Box<dyn Error>> {
    let selector = CandidateSelector::new(tracks, OPTION_COUNT)?;
    log::info!("[Main] {} distinct tracks in play", selector.len());

    let mut terminal = startup::enter_terminal()?;
    let mut keys = TerminalKeys;
    let time = MonotonicTime::new();
    let result = game::run_session(
        &mut terminal,
        settings,
        &selector,
        playback,
        &mut keys,
        &time,
    );
    startup::restore_terminal(&mut terminal)?;

    Ok(result?)
}

/// Older sign-ins were cached in the working directory.
fn legacy_token_caches() -> Vec<PathBuf> {
    vec![PathBuf::from(".spotifycache"), PathBuf::from(".cache")]
}

fn spotify_auth(settings: &Settings) -> Result<Auth, ApiError> {
    let cache_path = settings.token_cache_path();
    auth::migrate_legacy_cache(&cache_path, &legacy_token_caches());
    Auth::resolve(
        settings.spotify_credentials(),
        &settings.spotify.accounts_base,
        &cache_path,
        settings.spotify_token(),
    )
}

/// Authorization-code sign-in: approve in the browser, paste the redirect
/// address back, cache the token.
fn login(settings: &Settings) -> Result<(), ApiError> {
    let credentials = settings
        .spotify_credentials()
        .ok_or(ApiError::MissingCredentials)?;
    let url = auth::authorize_url(&credentials, &settings.spotify.accounts_base)?;

    println!("Approve access in your browser:\n\n  {url}\n");
    if let Err(e) = webbrowser::open(url.as_str()) {
        log::debug!("[Auth] could not open a browser: {e}");
    }
    print!("Paste the address you were redirected to: ");
    io::stdout().flush().map_err(|e| ApiError::Auth(e.to_string()))?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| ApiError::Auth(e.to_string()))?;
    let code = auth::code_from_redirect(&line)
        .ok_or_else(|| ApiError::Auth("no authorization code in that address".into()))?;

    let http = http_client(&settings.spotify)?;
    let token = auth::exchange_code(&http, &settings.spotify.accounts_base, &credentials, &code)?;
    let cache_path = settings.token_cache_path();
    auth::save_token_cache(&cache_path, &token)?;
    log::info!("[Auth] signed in, token cached at {}", cache_path.display());
    println!("Signed in. Token saved to {}", cache_path.display());
    Ok(())
}
