mod events;

pub use events::{EventSink, PlayerEvent};

use crate::library;
use crate::model::RepeatMode;
use crate::playlist::Playlist;
use crate::track::{Track, TrackRef};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Capability interface for front-ends driving playback.
pub trait Player {
    fn import_folder(&self, dir: &Path) -> usize;
    fn import_playlist(&self, path: &Path) -> usize;
    fn export_playlist(&self, path: &Path) -> bool;
    fn play(&self);
    fn pause(&self, is_automatic: bool);
    fn next(&self, autoplay: bool) -> bool;
    fn previous(&self) -> bool;
    fn shuffle(&self);
    fn unshuffle(&self);
    fn repeat(&self) -> RepeatMode;
    fn add_track(&self, path: &Path) -> bool;
    fn remove_track(&self, index: usize) -> bool;
    fn remove_duplicates(&self) -> usize;
    fn summary(&self) -> PlaylistSummary;
    fn terminate(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stopped,
    Playing,
    Paused,
    ShuttingDown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSummary {
    pub name: String,
    pub description: String,
    /// Backing playlist file, once the playlist was opened from or saved to one.
    pub file_path: Option<PathBuf>,
    /// Display labels in insertion order.
    pub tracks: Vec<String>,
    /// Insertion-order index of the now-playing track.
    pub current: Option<usize>,
    pub repeat_mode: RepeatMode,
    pub shuffled: bool,
    pub transport: Transport,
}

struct SharedState {
    playlist: Playlist,
    current: Option<TrackRef>,
    transport: Transport,
    // Bumped by every mutation so an inter-unit sleep can end early.
    epoch: u64,
}

impl SharedState {
    fn touch(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }

    fn adopt(&mut self, next: Option<TrackRef>) -> bool {
        if let Some(outgoing) = &self.current {
            outgoing.reset_cursor();
        }
        if let Some(incoming) = &next {
            incoming.reset_cursor();
        }
        self.current = next;
        if self.current.is_none() && self.transport != Transport::ShuttingDown {
            self.transport = Transport::Stopped;
        }
        self.touch();
        self.current.is_some()
    }

    fn advance(&mut self, autoplay: bool) -> bool {
        let next = self.playlist.next_track(autoplay);
        self.adopt(next)
    }

    fn retreat(&mut self) -> bool {
        let previous = self.playlist.previous_track();
        self.adopt(previous)
    }

    /// Re-points the now-playing handle when its track left the playlist.
    fn resync_current(&mut self) {
        let Some(current) = &self.current else {
            return;
        };
        if self.playlist.position_of(current).is_none() {
            let replacement = self.playlist.current_track();
            self.adopt(replacement);
        }
    }
}

struct Shared {
    state: Mutex<SharedState>,
    wake: Condvar,
    sink: Box<dyn EventSink>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: PlayerEvent) {
        self.sink.emit(event);
    }
}

pub struct PlaybackController {
    shared: Arc<Shared>,
    streamer: Option<JoinHandle<()>>,
}

impl PlaybackController {
    pub fn new(
        playlist: Playlist,
        sink: impl EventSink + 'static,
        unit_delay: Duration,
    ) -> Result<Self> {
        let current = playlist.current_track();
        let shared = Arc::new(Shared {
            state: Mutex::new(SharedState {
                playlist,
                current,
                transport: Transport::Stopped,
                epoch: 0,
            }),
            wake: Condvar::new(),
            sink: Box::new(sink),
        });

        let worker = Arc::clone(&shared);
        let streamer = thread::Builder::new()
            .name(String::from("tunestream-streamer"))
            .spawn(move || stream_loop(&worker, unit_delay))
            .context("failed to spawn streaming thread")?;

        Ok(Self {
            shared,
            streamer: Some(streamer),
        })
    }

    pub fn now_playing(&self) -> Option<TrackRef> {
        self.shared.lock().current.clone()
    }

    pub fn transport(&self) -> Transport {
        self.shared.lock().transport
    }

    pub fn set_repeat_mode(&self, mode: RepeatMode) {
        let mut state = self.shared.lock();
        state.playlist.set_repeat_mode(mode);
        self.shared.emit(PlayerEvent::RepeatChanged(mode));
    }

    pub fn toggle_shuffle(&self) {
        let shuffled = self.shared.lock().playlist.is_shuffled();
        if shuffled {
            self.unshuffle();
        } else {
            self.shuffle();
        }
    }

    /// Runs `inspect` against the playlist under the controller lock.
    pub fn inspect<R>(&self, inspect: impl FnOnce(&Playlist) -> R) -> R {
        inspect(&self.shared.lock().playlist)
    }

    fn replace_playlist(&self, source: &Path, loaded: Result<Playlist>) -> usize {
        let mut playlist = match loaded {
            Ok(playlist) => playlist,
            Err(err) => {
                warn!(source = %source.display(), error = %err, "import failed");
                self.shared.emit(PlayerEvent::Error(format!("{err:#}")));
                return 0;
            }
        };
        if playlist.is_empty() {
            self.shared.emit(PlayerEvent::Error(format!(
                "no readable tracks in {}",
                source.display()
            )));
            return 0;
        }

        self.pause(true);
        let mut state = self.shared.lock();
        playlist.set_repeat_mode(state.playlist.repeat_mode());
        if state.playlist.is_shuffled() {
            playlist.shuffle_from_start();
        }
        let count = playlist.len();
        let first = playlist.current_track();
        self.shared.emit(PlayerEvent::PlaylistLoaded {
            name: playlist.name().to_string(),
            tracks: count,
        });
        state.playlist = playlist;
        state.adopt(first);
        drop(state);
        self.shared.wake.notify_all();
        count
    }
}

impl Player for PlaybackController {
    fn import_folder(&self, dir: &Path) -> usize {
        self.replace_playlist(dir, Playlist::from_folder(dir))
    }

    fn import_playlist(&self, path: &Path) -> usize {
        self.replace_playlist(path, Playlist::open(path))
    }

    fn export_playlist(&self, path: &Path) -> bool {
        // Written outside the lock so a slow disk never stalls streaming.
        let snapshot = self.shared.lock().playlist.to_playlist_file();
        if let Err(err) = library::write_playlist_file(path, &snapshot) {
            warn!(path = %path.display(), error = %err, "export failed");
            self.shared.emit(PlayerEvent::Error(format!("{err:#}")));
            return false;
        }

        let mut state = self.shared.lock();
        state.playlist.mark_saved(path);
        self.shared.emit(PlayerEvent::Exported(path.to_path_buf()));
        true
    }

    fn play(&self) {
        let mut state = self.shared.lock();
        if matches!(state.transport, Transport::Playing | Transport::ShuttingDown) {
            return;
        }

        let track = if state.current.is_none() {
            state.playlist.reset_to_first_track()
        } else {
            state.playlist.current_track()
        };
        state.current = track.clone();

        let Some(track) = track else {
            self.shared.emit(PlayerEvent::NoTrack);
            return;
        };
        state.transport = Transport::Playing;
        state.touch();
        debug!(track = %track, "transport -> playing");
        self.shared.emit(PlayerEvent::Playing(track));
        drop(state);
        self.shared.wake.notify_all();
    }

    fn pause(&self, is_automatic: bool) {
        let mut state = self.shared.lock();
        let was_playing = state.transport == Transport::Playing;
        if was_playing {
            state.transport = Transport::Paused;
            state.touch();
        }

        if is_automatic {
            debug!(was_playing, "automatic pause");
        } else if was_playing {
            self.shared.emit(PlayerEvent::Paused);
        } else {
            self.shared
                .emit(PlayerEvent::Status(String::from("Nothing is playing")));
        }
        drop(state);
        self.shared.wake.notify_all();
    }

    fn next(&self, autoplay: bool) -> bool {
        let mut state = self.shared.lock();
        let found = state.advance(autoplay);
        self.announce_selection(&state);
        drop(state);
        self.shared.wake.notify_all();
        found
    }

    fn previous(&self) -> bool {
        let mut state = self.shared.lock();
        let found = state.retreat();
        self.announce_selection(&state);
        drop(state);
        self.shared.wake.notify_all();
        found
    }

    fn shuffle(&self) {
        let mut state = self.shared.lock();
        state.playlist.shuffle();
        state.touch();
        self.shared.emit(PlayerEvent::ShuffleChanged(true));
    }

    fn unshuffle(&self) {
        let mut state = self.shared.lock();
        state.playlist.unshuffle();
        state.touch();
        self.shared.emit(PlayerEvent::ShuffleChanged(false));
    }

    fn repeat(&self) -> RepeatMode {
        let mut state = self.shared.lock();
        let mode = state.playlist.repeat();
        self.shared.emit(PlayerEvent::RepeatChanged(mode));
        mode
    }

    fn add_track(&self, path: &Path) -> bool {
        let track = match Track::load_from(path) {
            Ok(track) => track,
            Err(err) => {
                self.shared.emit(PlayerEvent::Error(err.to_string()));
                return false;
            }
        };

        let mut state = self.shared.lock();
        let added = state.playlist.add_track(track);
        state.touch();
        self.shared.emit(PlayerEvent::TrackAdded(added));
        true
    }

    fn remove_track(&self, index: usize) -> bool {
        let mut state = self.shared.lock();
        let Some(removed) = state.playlist.remove_track(index) else {
            self.shared.emit(PlayerEvent::Status(format!(
                "No track at position {}",
                index + 1
            )));
            return false;
        };

        state.resync_current();
        state.touch();
        self.shared.emit(PlayerEvent::TrackRemoved(removed));
        drop(state);
        self.shared.wake.notify_all();
        true
    }

    fn remove_duplicates(&self) -> usize {
        let mut state = self.shared.lock();
        let removed = state.playlist.remove_duplicates();
        if removed > 0 {
            state.resync_current();
            state.touch();
        }
        self.shared.emit(PlayerEvent::DuplicatesRemoved(removed));
        drop(state);
        self.shared.wake.notify_all();
        removed
    }

    fn summary(&self) -> PlaylistSummary {
        let state = self.shared.lock();
        let playlist = &state.playlist;
        PlaylistSummary {
            name: playlist.name().to_string(),
            description: playlist.description().to_string(),
            file_path: playlist.file_path().map(Path::to_path_buf),
            tracks: playlist.tracks().iter().map(|t| t.to_string()).collect(),
            current: state.current.as_ref().and_then(|current| {
                playlist
                    .tracks()
                    .iter()
                    .position(|track| Arc::ptr_eq(track, current))
            }),
            repeat_mode: playlist.repeat_mode(),
            shuffled: playlist.is_shuffled(),
            transport: state.transport,
        }
    }

    fn terminate(&self) {
        let mut state = self.shared.lock();
        if state.transport == Transport::ShuttingDown {
            return;
        }
        state.transport = Transport::ShuttingDown;
        state.touch();
        self.shared.emit(PlayerEvent::ShuttingDown);
        drop(state);
        self.shared.wake.notify_all();
    }
}

impl PlaybackController {
    fn announce_selection(&self, state: &SharedState) {
        match &state.current {
            Some(track) => self.shared.emit(PlayerEvent::Selected(Arc::clone(track))),
            None => self.shared.emit(PlayerEvent::EndOfPlaylist),
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        // The streaming thread may be parked on the condvar; it must see the
        // shutdown before we join it.
        self.terminate();
        if let Some(handle) = self.streamer.take()
            && handle.join().is_err()
        {
            warn!("streaming thread panicked");
        }
    }
}

fn stream_loop(shared: &Shared, unit_delay: Duration) {
    let mut state = shared.lock();
    loop {
        match state.transport {
            Transport::ShuttingDown => break,
            Transport::Playing => {}
            Transport::Stopped | Transport::Paused => {
                state = shared
                    .wake
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            }
        }

        let Some(track) = state.current.clone() else {
            state.transport = Transport::Stopped;
            continue;
        };

        if track.content_position() == 0 {
            shared.emit(PlayerEvent::NowPlaying(Arc::clone(&track)));
        }

        match track.next_content_unit() {
            Some(unit) => shared.emit(PlayerEvent::Content(unit)),
            None => {
                shared.emit(PlayerEvent::TrackFinished(Arc::clone(&track)));
                if !state.advance(true) {
                    shared.emit(PlayerEvent::EndOfPlaylist);
                    continue;
                }
            }
        }

        let epoch = state.epoch;
        let (guard, _) = shared
            .wake
            .wait_timeout_while(state, unit_delay, |s| {
                s.transport == Transport::Playing && s.epoch == epoch
            })
            .unwrap_or_else(PoisonError::into_inner);
        state = guard;
    }
    debug!("streaming thread exiting");
}
