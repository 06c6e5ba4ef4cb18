use crate::config;
use crate::track::Track;
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Default)]
pub struct TrackScan {
    pub tracks: Vec<Track>,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistFile {
    pub name: String,
    pub description: String,
    pub tracks: Vec<PathBuf>,
}

/// Parses every regular file directly inside `root`, in file-name order.
/// Files that fail to parse are counted and skipped.
pub fn scan_folder(root: &Path) -> Result<TrackScan> {
    if !root.is_dir() {
        bail!("folder not found: {}", root.display());
    }

    let mut scan = TrackScan::default();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable folder entry");
                scan.skipped += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        load_into(&mut scan, entry.path());
    }

    debug!(
        folder = %root.display(),
        parsed = scan.tracks.len(),
        skipped = scan.skipped,
        "scanned folder"
    );
    Ok(scan)
}

pub fn load_tracks(paths: &[PathBuf]) -> TrackScan {
    let mut scan = TrackScan::default();
    for path in paths {
        load_into(&mut scan, path);
    }
    scan
}

fn load_into(scan: &mut TrackScan, path: &Path) {
    match Track::load_from(path) {
        Ok(track) => scan.tracks.push(track),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "skipping track");
            scan.skipped += 1;
        }
    }
}

/// Line 1 is the name, line 2 the description, then one track path per line
/// relative to the playlist file's own directory.
pub fn read_playlist_file(path: &Path) -> Result<PlaylistFile> {
    if !path.is_file() {
        bail!("playlist file not found: {}", path.display());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read playlist file {}", path.display()))?;
    let base = playlist_base_dir(path);

    let mut lines = raw.lines();
    let Some(name) = lines.next() else {
        bail!("playlist file is empty: {}", path.display());
    };
    let description = lines.next().unwrap_or_default();
    let tracks = lines
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| config::normalize_path(&base.join(line)))
        .collect();

    Ok(PlaylistFile {
        name: name.trim().to_string(),
        description: description.trim().to_string(),
        tracks,
    })
}

pub fn write_playlist_file(path: &Path, playlist: &PlaylistFile) -> Result<()> {
    let base = playlist_base_dir(path);
    let mut out = String::new();
    out.push_str(&single_line(&playlist.name));
    out.push('\n');
    out.push_str(&single_line(&playlist.description));
    out.push('\n');
    for track in &playlist.tracks {
        let relative = track.strip_prefix(&base).unwrap_or(track);
        out.push_str(&relative.to_string_lossy());
        out.push('\n');
    }

    fs::write(path, out)
        .with_context(|| format!("failed to write playlist file {}", path.display()))
}

fn playlist_base_dir(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    config::normalize_path(parent)
}

fn single_line(value: &str) -> String {
    value.lines().collect::<Vec<_>>().join(" ")
}
