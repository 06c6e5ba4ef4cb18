use crate::config;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Shared handle to a track. Identity (not content) is what playlists compare.
pub type TrackRef = Arc<Track>;

const DEFAULT_ARTIST: &str = "unknown";

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("failed to read track file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: unknown key `{key}`")]
    UnknownKey { line: usize, key: String },
    #[error("line {line}: key `{key}` appears more than once")]
    DuplicateKey { line: usize, key: String },
    #[error("line {line}: key `{key}` has no value")]
    MissingValue { line: usize, key: String },
    #[error("line {line}: duration `{value}` is not a whole number of milliseconds")]
    InvalidDuration { line: usize, value: String },
}

#[derive(Debug)]
pub struct Track {
    title: String,
    artist: String,
    codec: String,
    duration_ms: u64,
    content: String,
    source_path: PathBuf,
    // Byte offset into `content`, always on a char boundary.
    cursor: AtomicUsize,
}

#[derive(Default)]
struct Fields {
    title: Option<String>,
    artist: Option<String>,
    codec: Option<String>,
    duration_ms: Option<u64>,
    content: Option<String>,
}

impl Track {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            codec: String::new(),
            duration_ms: 0,
            content: content.into(),
            source_path: PathBuf::new(),
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = path.into();
        self
    }

    /// Reads and parses a track file, storing its canonical path as the source path.
    pub fn load_from(path: &Path) -> Result<Self, TrackError> {
        let raw = fs::read_to_string(path).map_err(|source| TrackError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let track = Self::parse(&raw)?;
        Ok(track.with_source_path(config::normalize_path(path)))
    }

    pub fn parse(raw: &str) -> Result<Self, TrackError> {
        let mut fields = Fields::default();

        for (idx, line) in raw.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (key, value) = match line.split_once(char::is_whitespace) {
                Some((key, value)) => (key, value.trim()),
                None => (line, ""),
            };

            let slot_taken = match key {
                "title" => fields.title.is_some(),
                "artist" => fields.artist.is_some(),
                "codec" => fields.codec.is_some(),
                "duration" => fields.duration_ms.is_some(),
                "content" => fields.content.is_some(),
                _ => {
                    return Err(TrackError::UnknownKey {
                        line: line_no,
                        key: key.to_string(),
                    });
                }
            };
            if slot_taken {
                return Err(TrackError::DuplicateKey {
                    line: line_no,
                    key: key.to_string(),
                });
            }
            if value.is_empty() {
                return Err(TrackError::MissingValue {
                    line: line_no,
                    key: key.to_string(),
                });
            }

            match key {
                "title" => fields.title = Some(value.to_string()),
                "artist" => fields.artist = Some(value.to_string()),
                "codec" => fields.codec = Some(value.to_string()),
                "duration" => {
                    let parsed =
                        value
                            .parse::<u64>()
                            .map_err(|_| TrackError::InvalidDuration {
                                line: line_no,
                                value: value.to_string(),
                            })?;
                    fields.duration_ms = Some(parsed);
                }
                _ => fields.content = Some(value.to_string()),
            }
        }

        Ok(Self::new(
            fields.title.unwrap_or_default(),
            fields.artist.unwrap_or_else(|| DEFAULT_ARTIST.to_string()),
            fields.content.unwrap_or_default(),
        )
        .with_codec(fields.codec.unwrap_or_default())
        .with_duration_ms(fields.duration_ms.unwrap_or(0)))
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn codec(&self) -> &str {
        &self.codec
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Returns the next unit of content, or `None` once the track is exhausted.
    pub fn next_content_unit(&self) -> Option<char> {
        let pos = self.cursor.load(Ordering::Acquire);
        let unit = self.content.get(pos..)?.chars().next()?;
        self.cursor.store(pos + unit.len_utf8(), Ordering::Release);
        Some(unit)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor.load(Ordering::Acquire) >= self.content.len()
    }

    pub fn reset_cursor(&self) {
        self.cursor.store(0, Ordering::Release);
    }

    pub fn content_position(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' by '{}'", self.title, self.artist)
    }
}
