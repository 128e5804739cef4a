use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rodio::{OutputStreamBuilder, Sink};

use crate::error::PlaybackError;
use crate::library::path_from_uri;

use super::sink::create_sink_at;
use super::{Ack, PlaybackController};

enum AudioCmd {
    Start {
        uri: String,
        position: Duration,
        reply: Sender<Result<(), PlaybackError>>,
    },
    Pause {
        reply: Sender<Result<(), PlaybackError>>,
    },
    Quit,
}

/// Plays `file://` tracks on the default output device.
///
/// The output stream lives on its own thread; commands travel over a channel
/// and each one waits for the thread's reply so `start` only returns once the
/// sink is playing.
pub struct LocalPlayback {
    tx: Sender<AudioCmd>,
    join: Option<JoinHandle<()>>,
}

impl LocalPlayback {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let join = thread::spawn(move || audio_thread(rx));
        Self {
            tx,
            join: Some(join),
        }
    }

    fn request(
        &self,
        build: impl FnOnce(Sender<Result<(), PlaybackError>>) -> AudioCmd,
    ) -> Result<Ack, PlaybackError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(build(reply_tx))
            .map_err(|_| PlaybackError::Disconnected)?;
        reply_rx
            .recv()
            .map_err(|_| PlaybackError::Disconnected)?
            .map(|()| Ack)
    }
}

impl Default for LocalPlayback {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackController for LocalPlayback {
    fn start(&mut self, track_uri: &str, position_ms: u64) -> Result<Ack, PlaybackError> {
        let uri = track_uri.to_string();
        self.request(|reply| AudioCmd::Start {
            uri,
            position: Duration::from_millis(position_ms),
            reply,
        })
    }

    fn pause(&mut self) -> Result<Ack, PlaybackError> {
        self.request(|reply| AudioCmd::Pause { reply })
    }
}

impl Drop for LocalPlayback {
    fn drop(&mut self) {
        let _ = self.tx.send(AudioCmd::Quit);
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}

fn audio_thread(rx: Receiver<AudioCmd>) {
    let mut stream = match OutputStreamBuilder::open_default_stream() {
        Ok(stream) => Some(stream),
        Err(e) => {
            log::error!("[Playback] no audio output device: {e}");
            None
        }
    };
    // rodio logs to stderr when OutputStream is dropped, which would land on
    // top of the game screen.
    if let Some(s) = stream.as_mut() {
        s.log_on_drop(false);
    }

    let mut sink: Option<Sink> = None;

    while let Ok(cmd) = rx.recv() {
        match cmd {
            AudioCmd::Start {
                uri,
                position,
                reply,
            } => {
                if let Some(old) = sink.take() {
                    old.stop();
                }
                let result = match (stream.as_ref(), path_from_uri(&uri)) {
                    (None, _) => Err(PlaybackError::NoDevice),
                    (_, None) => Err(PlaybackError::UnsupportedUri(uri.clone())),
                    (Some(stream), Some(path)) => {
                        create_sink_at(stream, &path, position).map(|new_sink| {
                            new_sink.play();
                            sink = Some(new_sink);
                        })
                    }
                };
                if let Err(e) = &result {
                    log::warn!("[Playback] start {uri} failed: {e}");
                }
                let _ = reply.send(result);
            }
            AudioCmd::Pause { reply } => {
                if let Some(s) = sink.as_ref() {
                    s.pause();
                }
                let _ = reply.send(Ok(()));
            }
            AudioCmd::Quit => break,
        }
    }

    if let Some(s) = sink.take() {
        s.stop();
    }
}
