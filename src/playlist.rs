use crate::config;
use crate::library::{self, PlaylistFile};
use crate::model::RepeatMode;
use crate::track::{Track, TrackRef};
use anyhow::Result;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Position in the active sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// The playlist is empty.
    Unset,
    At(usize),
    /// Navigation ran past the last track with repeat off.
    Finished,
}

#[derive(Debug)]
pub struct Playlist {
    name: String,
    description: String,
    file_path: Option<PathBuf>,
    valid: bool,
    tracks: Vec<TrackRef>,
    shuffled: Vec<TrackRef>,
    cursor: Cursor,
    current: Option<TrackRef>,
    shuffle_active: bool,
    repeat_mode: RepeatMode,
    rng: SmallRng,
}

impl Playlist {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_rng(name.into(), SmallRng::from_os_rng())
    }

    pub fn with_seed(name: impl Into<String>, seed: u64) -> Self {
        Self::with_rng(name.into(), SmallRng::seed_from_u64(seed))
    }

    fn with_rng(name: String, rng: SmallRng) -> Self {
        Self {
            name,
            description: String::new(),
            file_path: None,
            valid: false,
            tracks: Vec::new(),
            shuffled: Vec::new(),
            cursor: Cursor::Unset,
            current: None,
            shuffle_active: false,
            repeat_mode: RepeatMode::None,
            rng,
        }
    }

    /// Builds a playlist from every parseable track file directly inside `dir`.
    pub fn from_folder(dir: &Path) -> Result<Self> {
        let name = dir
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| dir.display().to_string());
        let mut playlist = Self::new(name);
        playlist.import_folder(dir)?;
        Ok(playlist)
    }

    /// Loads a playlist file. Track entries that fail to parse are skipped.
    pub fn open(path: &Path) -> Result<Self> {
        let file = library::read_playlist_file(path)?;
        let mut playlist = Self::new(file.name);
        playlist.description = file.description;
        playlist.file_path = Some(config::normalize_path(path));

        let scan = library::load_tracks(&file.tracks);
        let count = playlist.import_tracks(scan.tracks);
        playlist.valid = true;
        info!(
            playlist = %playlist.name,
            imported = count,
            skipped = scan.skipped,
            "opened playlist file"
        );
        Ok(playlist)
    }

    pub fn import_folder(&mut self, dir: &Path) -> Result<usize> {
        let scan = library::scan_folder(dir)?;
        let count = self.import_tracks(scan.tracks);
        self.valid = true;
        info!(
            folder = %dir.display(),
            imported = count,
            skipped = scan.skipped,
            "imported folder"
        );
        Ok(count)
    }

    /// Adds all `tracks` and moves the cursor to the start of the active sequence.
    pub fn import_tracks(&mut self, tracks: impl IntoIterator<Item = Track>) -> usize {
        let mut count = 0;
        for track in tracks {
            self.add_track(track);
            count += 1;
        }
        self.reset_to_first_track();
        count
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        library::write_playlist_file(path, &self.to_playlist_file())?;
        self.mark_saved(path);
        Ok(())
    }

    /// Records `path` as the backing file after it was written elsewhere.
    pub fn mark_saved(&mut self, path: &Path) {
        self.file_path = Some(config::normalize_path(path));
    }

    pub fn to_playlist_file(&self) -> PlaylistFile {
        PlaylistFile {
            name: self.name.clone(),
            description: self.description.clone(),
            tracks: self
                .tracks
                .iter()
                .map(|track| track.source_path().to_path_buf())
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Tracks in insertion order.
    pub fn tracks(&self) -> &[TrackRef] {
        &self.tracks
    }

    pub fn shuffled_order(&self) -> &[TrackRef] {
        &self.shuffled
    }

    /// The sequence navigation currently walks.
    pub fn active_order(&self) -> &[TrackRef] {
        if self.shuffle_active {
            &self.shuffled
        } else {
            &self.tracks
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle_active
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat_mode = mode;
    }

    pub fn position_of(&self, track: &TrackRef) -> Option<usize> {
        self.active_order()
            .iter()
            .position(|candidate| Arc::ptr_eq(candidate, track))
    }

    pub fn add_track(&mut self, track: impl Into<TrackRef>) -> TrackRef {
        let track = track.into();
        // The shuffled order is only maintained while it mirrors `tracks`.
        let mirrored = self.shuffled.len() == self.tracks.len();
        self.tracks.push(Arc::clone(&track));

        if mirrored {
            let slot = self.rng.random_range(0..=self.shuffled.len());
            self.shuffled.insert(slot, Arc::clone(&track));
            if self.shuffle_active
                && let Cursor::At(pos) = self.cursor
                && slot <= pos
            {
                self.cursor = Cursor::At(pos + 1);
            }
        }

        if self.cursor == Cursor::Unset {
            self.point_at(Cursor::At(0));
        }
        track
    }

    /// Removes the track at `index` in insertion order. Fails without mutating
    /// when `index` is not below `len()`.
    pub fn remove_track(&mut self, index: usize) -> Option<TrackRef> {
        if index >= self.tracks.len() {
            return None;
        }

        let removed = self.tracks.remove(index);
        if !self.shuffle_active {
            self.cursor = cursor_after_removal(self.cursor, index, self.tracks.len());
        }

        if let Some(slot) = self
            .shuffled
            .iter()
            .position(|candidate| Arc::ptr_eq(candidate, &removed))
        {
            self.shuffled.remove(slot);
            if self.shuffle_active {
                self.cursor = cursor_after_removal(self.cursor, slot, self.shuffled.len());
            }
        }

        self.point_at(self.cursor);
        debug!(track = %removed, index, "removed track");
        Some(removed)
    }

    /// Drops every track whose (title, artist) matches an earlier one.
    pub fn remove_duplicates(&mut self) -> usize {
        let duplicates: Vec<usize> = {
            let mut seen = HashSet::new();
            self.tracks
                .iter()
                .enumerate()
                .filter(|&(_, track)| !seen.insert((track.title(), track.artist())))
                .map(|(idx, _)| idx)
                .collect()
        };

        for idx in duplicates.iter().rev() {
            self.remove_track(*idx);
        }
        duplicates.len()
    }

    pub fn current_track(&self) -> Option<TrackRef> {
        self.current.clone()
    }

    pub fn reset_to_first_track(&mut self) -> Option<TrackRef> {
        if self.active_order().is_empty() {
            return None;
        }
        self.point_at(Cursor::At(0))
    }

    pub fn next_track(&mut self, autoplay: bool) -> Option<TrackRef> {
        if self.tracks.is_empty() {
            return None;
        }

        if self.repeat_mode == RepeatMode::RepeatOne {
            if autoplay {
                return self.current.clone();
            }
            self.repeat_mode = RepeatMode::RepeatAll;
        }

        let len = self.active_order().len();
        let next = match self.cursor {
            Cursor::At(pos) if pos + 1 < len => Cursor::At(pos + 1),
            Cursor::At(_) if self.repeat_mode == RepeatMode::RepeatAll => Cursor::At(0),
            Cursor::At(_) => Cursor::Finished,
            Cursor::Finished => return None,
            Cursor::Unset => Cursor::At(0),
        };
        self.point_at(next)
    }

    pub fn previous_track(&mut self) -> Option<TrackRef> {
        if self.tracks.is_empty() {
            return None;
        }

        if self.repeat_mode == RepeatMode::RepeatOne {
            return self.current.clone();
        }

        let len = self.active_order().len();
        let previous = match self.cursor {
            Cursor::At(pos) if pos > 0 => Cursor::At(pos - 1),
            Cursor::At(_) if self.repeat_mode == RepeatMode::RepeatAll => Cursor::At(len - 1),
            Cursor::At(_) => return None,
            Cursor::Finished => Cursor::At(len - 1),
            Cursor::Unset => Cursor::At(0),
        };
        self.point_at(previous)
    }

    /// Re-randomizes the shuffled order with the current track in front and
    /// switches navigation to it.
    pub fn shuffle(&mut self) {
        let mut order = self.tracks.clone();
        order.shuffle(&mut self.rng);
        if let Some(current) = &self.current
            && let Some(pos) = order
                .iter()
                .position(|candidate| Arc::ptr_eq(candidate, current))
        {
            let track = order.remove(pos);
            order.insert(0, track);
        }

        self.shuffled = order;
        self.shuffle_active = true;
        if self.shuffled.is_empty() {
            self.point_at(Cursor::Unset);
        } else {
            self.point_at(Cursor::At(0));
        }
    }

    /// Shuffles without pinning the current track, then starts from the first
    /// track of the new order.
    pub fn shuffle_from_start(&mut self) -> Option<TrackRef> {
        self.current = None;
        self.shuffle();
        self.current_track()
    }

    pub fn unshuffle(&mut self) {
        self.shuffle_active = false;
        let located = self.current.as_ref().and_then(|current| {
            self.tracks
                .iter()
                .position(|candidate| Arc::ptr_eq(candidate, current))
        });
        let cursor = match located {
            Some(pos) => Cursor::At(pos),
            None if self.tracks.is_empty() => Cursor::Unset,
            None => Cursor::At(0),
        };
        self.shuffled.clear();
        self.point_at(cursor);
    }

    pub fn repeat(&mut self) -> RepeatMode {
        self.repeat_mode = self.repeat_mode.next();
        self.repeat_mode
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.shuffled.clear();
        self.point_at(Cursor::Unset);
    }

    fn point_at(&mut self, cursor: Cursor) -> Option<TrackRef> {
        self.cursor = cursor;
        self.current = match cursor {
            Cursor::At(pos) => self.active_order().get(pos).cloned(),
            Cursor::Unset | Cursor::Finished => None,
        };
        self.current.clone()
    }
}

fn cursor_after_removal(cursor: Cursor, removed: usize, remaining: usize) -> Cursor {
    if remaining == 0 {
        return Cursor::Unset;
    }
    match cursor {
        Cursor::At(pos) if removed < pos => Cursor::At(pos - 1),
        // The removed track was the last one; wrap to the new first track.
        Cursor::At(pos) if removed == pos && pos >= remaining => Cursor::At(0),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prop_assert;

    fn playlist_of(titles: &[&str]) -> Playlist {
        let mut playlist = Playlist::with_seed("test", 7);
        for title in titles {
            playlist.add_track(Track::new(*title, "artist", *title));
        }
        playlist
    }

    fn title(track: Option<TrackRef>) -> Option<String> {
        track.map(|track| track.title().to_string())
    }

    fn titles(order: &[TrackRef]) -> Vec<&str> {
        order.iter().map(|track| track.title()).collect()
    }

    fn identities(order: &[TrackRef]) -> Vec<usize> {
        let mut ids: Vec<usize> = order.iter().map(|t| Arc::as_ptr(t) as usize).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn first_track_initialises_cursor() {
        let mut playlist = Playlist::with_seed("test", 1);
        let added = playlist.add_track(Track::new("x", "a", "x"));

        assert_eq!(playlist.len(), 1);
        assert_eq!(playlist.shuffled_order().len(), 1);
        assert_eq!(playlist.cursor(), Cursor::At(0));
        let current = playlist.current_track().expect("current");
        assert!(Arc::ptr_eq(&current, &added));
    }

    #[test]
    fn empty_playlist_navigation_returns_nothing() {
        let mut playlist = Playlist::with_seed("empty", 1);
        playlist.set_repeat_mode(RepeatMode::RepeatOne);

        assert!(playlist.current_track().is_none());
        assert!(playlist.next_track(false).is_none());
        assert!(playlist.previous_track().is_none());
        assert!(playlist.reset_to_first_track().is_none());
        assert_eq!(playlist.cursor(), Cursor::Unset);
        assert_eq!(playlist.repeat_mode(), RepeatMode::RepeatOne);
    }

    #[test]
    fn no_repeat_walks_to_the_end_and_stops() {
        let mut playlist = playlist_of(&["A", "B", "C"]);

        assert_eq!(title(playlist.current_track()).as_deref(), Some("A"));
        assert_eq!(title(playlist.next_track(false)).as_deref(), Some("B"));
        assert_eq!(title(playlist.next_track(false)).as_deref(), Some("C"));
        assert_eq!(title(playlist.previous_track()).as_deref(), Some("B"));
        assert_eq!(title(playlist.next_track(false)).as_deref(), Some("C"));
        assert!(playlist.next_track(true).is_none());
        assert!(playlist.current_track().is_none());
        assert_eq!(playlist.cursor(), Cursor::Finished);
        assert!(playlist.next_track(false).is_none());
    }

    #[test]
    fn previous_after_finishing_returns_last_track() {
        let mut playlist = playlist_of(&["A", "B"]);
        playlist.next_track(false);
        playlist.next_track(false);
        assert_eq!(playlist.cursor(), Cursor::Finished);

        assert_eq!(title(playlist.previous_track()).as_deref(), Some("B"));
    }

    #[test]
    fn previous_at_start_without_repeat_keeps_cursor() {
        let mut playlist = playlist_of(&["A", "B"]);
        assert!(playlist.previous_track().is_none());
        assert_eq!(playlist.cursor(), Cursor::At(0));
        assert_eq!(title(playlist.current_track()).as_deref(), Some("A"));
    }

    #[test]
    fn repeat_all_wraps_both_directions() {
        let mut playlist = playlist_of(&["A", "B", "C"]);
        playlist.set_repeat_mode(RepeatMode::RepeatAll);

        assert_eq!(title(playlist.previous_track()).as_deref(), Some("C"));
        assert_eq!(title(playlist.next_track(true)).as_deref(), Some("A"));
    }

    #[test]
    fn repeat_one_loops_on_autoplay_and_demotes_on_skip() {
        let mut playlist = playlist_of(&["A", "B", "C"]);
        playlist.next_track(false);
        playlist.set_repeat_mode(RepeatMode::RepeatOne);

        assert_eq!(title(playlist.next_track(true)).as_deref(), Some("B"));
        assert_eq!(playlist.cursor(), Cursor::At(1));
        assert_eq!(title(playlist.previous_track()).as_deref(), Some("B"));

        assert_eq!(title(playlist.next_track(false)).as_deref(), Some("C"));
        assert_eq!(playlist.repeat_mode(), RepeatMode::RepeatAll);
    }

    #[test]
    fn repeat_cycles_modes() {
        let mut playlist = playlist_of(&["A"]);
        assert_eq!(playlist.repeat(), RepeatMode::RepeatAll);
        assert_eq!(playlist.repeat(), RepeatMode::RepeatOne);
        assert_eq!(playlist.repeat(), RepeatMode::None);
    }

    #[test]
    fn shuffle_from_start_picks_a_random_first_track() {
        let names = ["t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7"];
        let mut firsts = HashSet::new();
        for seed in 0..40 {
            let mut playlist = Playlist::with_seed("mix", seed);
            for name in names {
                playlist.add_track(Track::new(name, "artist", name));
            }
            assert_eq!(title(playlist.current_track()).as_deref(), Some("t0"));

            let first = playlist.shuffle_from_start().expect("first track");
            assert_eq!(playlist.cursor(), Cursor::At(0));
            assert!(Arc::ptr_eq(&playlist.active_order()[0], &first));
            assert_eq!(identities(playlist.shuffled_order()), identities(playlist.tracks()));
            firsts.insert(first.title().to_string());
        }
        assert!(firsts.len() > 1, "first tracks: {firsts:?}");
    }

    #[test]
    fn shuffle_puts_current_track_first() {
        let mut playlist = playlist_of(&["A", "B", "C", "D", "E"]);
        playlist.next_track(false);
        playlist.next_track(false);

        playlist.shuffle();
        assert!(playlist.is_shuffled());
        assert_eq!(playlist.cursor(), Cursor::At(0));
        assert_eq!(playlist.shuffled_order()[0].title(), "C");
        assert_eq!(title(playlist.current_track()).as_deref(), Some("C"));
        assert_eq!(identities(playlist.shuffled_order()), identities(playlist.tracks()));
    }

    #[test]
    fn unshuffle_relocates_cursor_and_clears_shuffled_order() {
        let mut playlist = playlist_of(&["A", "B", "C", "D"]);
        playlist.shuffle();
        playlist.next_track(false);
        let current = playlist.current_track().expect("current");

        playlist.unshuffle();
        assert!(!playlist.is_shuffled());
        assert!(playlist.shuffled_order().is_empty());
        assert_eq!(titles(playlist.tracks()), vec!["A", "B", "C", "D"]);
        assert_eq!(playlist.cursor(), Cursor::At(playlist.position_of(&current).expect("pos")));
        assert!(Arc::ptr_eq(&playlist.current_track().expect("current"), &current));
    }

    #[test]
    fn unshuffle_after_finishing_falls_back_to_first_track() {
        let mut playlist = playlist_of(&["A", "B"]);
        playlist.shuffle();
        playlist.next_track(false);
        playlist.next_track(false);
        assert_eq!(playlist.cursor(), Cursor::Finished);

        playlist.unshuffle();
        assert_eq!(playlist.cursor(), Cursor::At(0));
        assert_eq!(title(playlist.current_track()).as_deref(), Some("A"));
    }

    #[test]
    fn adding_while_shuffled_keeps_current_track() {
        let mut playlist = playlist_of(&["A", "B", "C"]);
        playlist.shuffle();
        playlist.next_track(false);
        let current = playlist.current_track().expect("current");

        for n in 0..10 {
            playlist.add_track(Track::new(format!("extra {n}"), "x", ""));
            let now = playlist.current_track().expect("current");
            assert!(Arc::ptr_eq(&now, &current));
            assert_eq!(playlist.position_of(&current), Some(match playlist.cursor() {
                Cursor::At(pos) => pos,
                other => panic!("unexpected cursor {other:?}"),
            }));
        }
        assert_eq!(identities(playlist.shuffled_order()), identities(playlist.tracks()));
    }

    #[test]
    fn adding_after_unshuffle_leaves_shuffled_order_empty_until_reshuffled() {
        let mut playlist = playlist_of(&["A", "B"]);
        playlist.shuffle();
        playlist.unshuffle();
        playlist.add_track(Track::new("C", "x", ""));
        assert!(playlist.shuffled_order().is_empty());

        playlist.shuffle();
        assert_eq!(playlist.shuffled_order().len(), 3);
        assert_eq!(identities(playlist.shuffled_order()), identities(playlist.tracks()));
    }

    #[test]
    fn remove_rejects_out_of_range_index() {
        let mut playlist = playlist_of(&["A", "B"]);
        assert!(playlist.remove_track(2).is_none());
        assert!(playlist.remove_track(usize::MAX).is_none());
        assert_eq!(playlist.len(), 2);
    }

    #[test]
    fn removing_current_track_advances_to_next() {
        let mut playlist = playlist_of(&["A", "B", "C"]);
        playlist.next_track(false);

        let removed = playlist.remove_track(1).expect("removed");
        assert_eq!(removed.title(), "B");
        assert_eq!(title(playlist.current_track()).as_deref(), Some("C"));
        assert_eq!(playlist.shuffled_order().len(), 2);
    }

    #[test]
    fn removing_current_last_track_wraps_to_first() {
        let mut playlist = playlist_of(&["A", "B", "C"]);
        playlist.next_track(false);
        playlist.next_track(false);

        playlist.remove_track(2);
        assert_eq!(playlist.cursor(), Cursor::At(0));
        assert_eq!(title(playlist.current_track()).as_deref(), Some("A"));
    }

    #[test]
    fn removing_before_cursor_keeps_current_track() {
        let mut playlist = playlist_of(&["A", "B", "C"]);
        playlist.next_track(false);
        playlist.next_track(false);

        playlist.remove_track(0);
        assert_eq!(playlist.cursor(), Cursor::At(1));
        assert_eq!(title(playlist.current_track()).as_deref(), Some("C"));
    }

    #[test]
    fn removing_only_track_empties_playlist() {
        let mut playlist = playlist_of(&["A"]);
        playlist.remove_track(0);
        assert!(playlist.is_empty());
        assert!(playlist.shuffled_order().is_empty());
        assert_eq!(playlist.cursor(), Cursor::Unset);
        assert!(playlist.current_track().is_none());
    }

    #[test]
    fn removing_while_shuffled_tracks_shuffled_cursor() {
        let mut playlist = playlist_of(&["A", "B", "C", "D"]);
        playlist.shuffle();
        let current = playlist.current_track().expect("current");
        let idx = playlist
            .tracks()
            .iter()
            .position(|track| Arc::ptr_eq(track, &current))
            .expect("index");

        playlist.remove_track(idx);
        let now = playlist.current_track().expect("current after removal");
        assert!(Arc::ptr_eq(&now, &playlist.shuffled_order()[0]));
        assert_eq!(identities(playlist.shuffled_order()), identities(playlist.tracks()));
    }

    #[test]
    fn remove_duplicates_keeps_first_occurrence() {
        let mut playlist = Playlist::with_seed("dupes", 3);
        playlist.add_track(Track::new("Song", "Band", "1"));
        playlist.add_track(Track::new("Song", "Other", "2"));
        playlist.add_track(Track::new("Song", "Band", "3"));
        playlist.add_track(Track::new("Tune", "Band", "4"));
        playlist.add_track(Track::new("Tune", "Band", "5"));

        assert_eq!(playlist.remove_duplicates(), 2);
        let contents: Vec<&str> = playlist.tracks().iter().map(|t| t.content()).collect();
        assert_eq!(contents, vec!["1", "2", "4"]);
        assert_eq!(identities(playlist.shuffled_order()), identities(playlist.tracks()));
        assert_eq!(playlist.remove_duplicates(), 0);
    }

    #[test]
    fn import_tracks_resets_to_first_of_active_order() {
        let mut playlist = Playlist::with_seed("bulk", 5);
        playlist.shuffle();
        let count = playlist.import_tracks(vec![
            Track::new("A", "x", ""),
            Track::new("B", "x", ""),
            Track::new("C", "x", ""),
        ]);

        assert_eq!(count, 3);
        assert_eq!(playlist.cursor(), Cursor::At(0));
        let current = playlist.current_track().expect("current");
        assert!(Arc::ptr_eq(&current, &playlist.shuffled_order()[0]));
    }

    #[test]
    fn clear_drops_tracks_but_keeps_identity() {
        let mut playlist = playlist_of(&["A", "B"]);
        playlist.set_description("keep me");
        playlist.clear();
        assert!(playlist.is_empty());
        assert!(playlist.current_track().is_none());
        assert_eq!(playlist.name(), "test");
        assert_eq!(playlist.description(), "keep me");
    }

    proptest::proptest! {
        #[test]
        fn repeat_all_returns_to_start_after_len_steps(len in 1usize..40, shuffled in proptest::bool::ANY) {
            let mut playlist = Playlist::with_seed("loop", len as u64);
            for n in 0..len {
                playlist.add_track(Track::new(format!("{n}"), "x", ""));
            }
            if shuffled {
                playlist.shuffle();
            }
            playlist.set_repeat_mode(RepeatMode::RepeatAll);
            let start = playlist.reset_to_first_track().expect("start");

            let mut last = None;
            for _ in 0..len {
                last = playlist.next_track(false);
            }
            let last = last.expect("wrapped track");
            prop_assert!(Arc::ptr_eq(&last, &start));
        }

        #[test]
        fn shuffle_round_trip_preserves_current_and_order(len in 1usize..30, steps in 0usize..30, seed in 0u64..1000) {
            let mut playlist = Playlist::with_seed("trip", seed);
            for n in 0..len {
                playlist.add_track(Track::new(format!("{n}"), "x", ""));
            }
            playlist.set_repeat_mode(RepeatMode::RepeatAll);
            for _ in 0..steps {
                playlist.next_track(false);
            }
            let before: Vec<TrackRef> = playlist.tracks().to_vec();
            let current = playlist.current_track().expect("current");

            playlist.shuffle();
            playlist.unshuffle();

            let after = playlist.current_track().expect("current after");
            prop_assert!(Arc::ptr_eq(&after, &current));
            prop_assert!(before.iter().zip(playlist.tracks()).all(|(a, b)| Arc::ptr_eq(a, b)));
        }

        #[test]
        fn invariants_hold_after_random_ops(ops in proptest::collection::vec((0u8..9, 0usize..12), 1..200)) {
            let mut playlist = Playlist::with_seed("ops", 11);
            for (op, arg) in ops {
                match op {
                    0 | 1 => {
                        playlist.add_track(Track::new(format!("t{}", arg % 4), "x", ""));
                    }
                    2 => {
                        playlist.remove_track(arg);
                    }
                    3 => {
                        playlist.next_track(arg % 2 == 0);
                    }
                    4 => {
                        playlist.previous_track();
                    }
                    5 => playlist.shuffle(),
                    6 => playlist.unshuffle(),
                    7 => {
                        playlist.repeat();
                    }
                    _ => {
                        playlist.remove_duplicates();
                    }
                }

                let shuffled = playlist.shuffled_order();
                if !shuffled.is_empty() && !playlist.is_empty() {
                    prop_assert!(identities(shuffled) == identities(playlist.tracks()));
                }
                if playlist.is_shuffled() {
                    prop_assert!(shuffled.len() == playlist.len());
                }
                match playlist.cursor() {
                    Cursor::At(pos) => {
                        prop_assert!(pos < playlist.active_order().len());
                        let current = playlist.current_track();
                        prop_assert!(current.is_some_and(|c| Arc::ptr_eq(&c, &playlist.active_order()[pos])));
                    }
                    Cursor::Unset => {
                        prop_assert!(playlist.is_empty());
                        prop_assert!(playlist.current_track().is_none());
                    }
                    Cursor::Finished => {
                        prop_assert!(!playlist.is_empty());
                        prop_assert!(playlist.current_track().is_none());
                    }
                }
            }
        }
    }
}
