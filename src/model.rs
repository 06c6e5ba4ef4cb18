use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RepeatMode {
    #[default]
    None,
    RepeatAll,
    RepeatOne,
}

impl RepeatMode {
    pub fn next(self) -> Self {
        match self {
            Self::None => Self::RepeatAll,
            Self::RepeatAll => Self::RepeatOne,
            Self::RepeatOne => Self::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "no repeat",
            Self::RepeatAll => "repeat all",
            Self::RepeatOne => "repeat one",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedState {
    #[serde(default = "default_stream_delay_ms")]
    pub stream_delay_ms: u64,
    #[serde(default)]
    pub repeat_mode: RepeatMode,
    #[serde(default)]
    pub shuffled: bool,
    #[serde(default)]
    pub last_playlist: Option<PathBuf>,
}

fn default_stream_delay_ms() -> u64 {
    1_000
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            stream_delay_ms: default_stream_delay_ms(),
            repeat_mode: RepeatMode::default(),
            shuffled: false,
            last_playlist: None,
        }
    }
}
