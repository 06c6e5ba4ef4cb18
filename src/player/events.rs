use crate::model::RepeatMode;
use crate::track::TrackRef;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Sender;

#[derive(Debug, Clone)]
pub enum PlayerEvent {
    PlaylistLoaded { name: String, tracks: usize },
    Playing(TrackRef),
    Paused,
    /// The streaming thread started emitting a track from its beginning.
    NowPlaying(TrackRef),
    Content(char),
    TrackFinished(TrackRef),
    Selected(TrackRef),
    EndOfPlaylist,
    NoTrack,
    ShuffleChanged(bool),
    RepeatChanged(RepeatMode),
    TrackAdded(TrackRef),
    TrackRemoved(TrackRef),
    DuplicatesRemoved(usize),
    Exported(PathBuf),
    Status(String),
    Error(String),
    ShuttingDown,
}

/// One-way presentation sink. Implementations must not call back into the
/// controller: events are emitted while the controller lock is held.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PlayerEvent);
}

impl EventSink for Sender<PlayerEvent> {
    fn emit(&self, event: PlayerEvent) {
        let _ = self.send(event);
    }
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: PlayerEvent) {
        (**self).emit(event);
    }
}
