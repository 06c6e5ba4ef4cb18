#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::Arc;
use tunestream::playlist::{Cursor, Playlist};
use tunestream::track::Track;

fuzz_target!(|data: &[u8]| {
    let mut playlist = Playlist::with_seed("fuzz", 0xF00D);
    let mut added = 0usize;

    for byte in data {
        match byte % 9 {
            0 | 1 => {
                // Few distinct titles so dedupe has work to do.
                let title = format!("t{}", byte % 4);
                playlist.add_track(Track::new(title, "a", "x"));
                added += 1;
            }
            2 => {
                let len = playlist.len();
                let removed = playlist.remove_track(usize::from(*byte) % (len + 1));
                assert_eq!(removed.is_some(), usize::from(*byte) % (len + 1) < len);
            }
            3 => {
                let _ = playlist.next_track(byte & 0x10 != 0);
            }
            4 => {
                let _ = playlist.previous_track();
            }
            5 => playlist.shuffle(),
            6 => playlist.unshuffle(),
            7 => {
                let _ = playlist.repeat();
            }
            _ => {
                let _ = playlist.remove_duplicates();
            }
        }

        assert!(playlist.len() <= added);
        if playlist.is_shuffled() {
            assert_eq!(playlist.shuffled_order().len(), playlist.len());
            for track in playlist.tracks() {
                assert!(playlist
                    .shuffled_order()
                    .iter()
                    .any(|candidate| Arc::ptr_eq(candidate, track)));
            }
        }
        match playlist.cursor() {
            Cursor::At(pos) => {
                let current = playlist.current_track().expect("cursor implies current track");
                assert!(Arc::ptr_eq(&playlist.active_order()[pos], &current));
            }
            Cursor::Unset => assert!(playlist.is_empty() && playlist.current_track().is_none()),
            Cursor::Finished => assert!(playlist.current_track().is_none()),
        }
    }
});
