mod cli;
mod config;
mod error;
mod history;
mod library;
mod logging;
mod playback;
mod round;
mod runtime;
mod score;
mod spotify;
#[cfg(test)]
mod testing;
mod ui;

fn main() {
    if let Err(e) = runtime::run() {
        eprintln!("tunequiz: {e}");
        std::process::exit(1);
    }
}
