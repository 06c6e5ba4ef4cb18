use crate::config;
use crate::player::{EventSink, PlaybackController, Player, PlayerEvent, PlaylistSummary};
use crate::playlist::Playlist;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, queue};
use std::io::{Write, stdout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

const KEY_HELP: &[&str] = &[
    "Z play  X pause  N next  B previous",
    "S shuffle on/off  R cycle repeat  D remove duplicates",
    "L list tracks  H help  Q quit",
    ":import <folder|file>  :export <file>  :add <track file>  :remove <n>  :help",
];

#[derive(Debug, Default)]
pub struct AppStartupOptions {
    pub playlist: Option<PathBuf>,
    pub folder: Option<PathBuf>,
    pub delay_ms: Option<u64>,
}

pub fn run_with_startup(options: AppStartupOptions) -> Result<()> {
    let mut state = config::load_state()?;
    if let Some(delay_ms) = options.delay_ms {
        state.stream_delay_ms = delay_ms;
    }

    let console = Arc::new(ConsoleSink::default());
    let controller = PlaybackController::new(
        Playlist::new("untitled"),
        Arc::clone(&console),
        Duration::from_millis(state.stream_delay_ms),
    )?;

    enable_raw_mode()?;
    console.lines(Color::DarkGrey, KEY_HELP);

    controller.set_repeat_mode(state.repeat_mode);
    if state.shuffled {
        controller.shuffle();
    }
    if let Some(folder) = &options.folder {
        controller.import_folder(folder);
    } else if let Some(playlist) = options.playlist.as_ref().or(state.last_playlist.as_ref()) {
        controller.import_playlist(playlist);
    }

    let mut command_mode = false;
    let mut command_buffer = String::new();

    let result: Result<()> = loop {
        let event = match event::read() {
            Ok(event) => event,
            Err(err) => break Err(err.into()),
        };
        let Event::Key(key) = event else {
            continue;
        };

        if key.kind != KeyEventKind::Press {
            continue;
        }

        if command_mode {
            match key.code {
                KeyCode::Esc => {
                    command_mode = false;
                    command_buffer.clear();
                    console.line(Color::DarkGrey, "cancelled");
                }
                KeyCode::Enter => {
                    console.end_line();
                    if let Some(status) = run_command(&controller, &command_buffer) {
                        console.line(Color::Yellow, &status);
                    }
                    command_mode = false;
                    command_buffer.clear();
                }
                KeyCode::Backspace => {
                    if command_buffer.pop().is_some() {
                        console.echo("\u{8} \u{8}");
                    }
                }
                KeyCode::Char(ch) => {
                    command_buffer.push(ch);
                    console.echo(&ch.to_string());
                }
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break Ok(()),
            KeyCode::Char(ch) => match ch.to_ascii_lowercase() {
                'q' => break Ok(()),
                'z' => controller.play(),
                'x' => controller.pause(false),
                'n' => {
                    controller.next(false);
                }
                'b' => {
                    controller.previous();
                }
                's' => controller.toggle_shuffle(),
                'r' => {
                    controller.repeat();
                }
                'd' => {
                    controller.remove_duplicates();
                }
                'l' => console.lines(Color::White, &format_listing(&controller.summary())),
                'h' => console.lines(Color::DarkGrey, KEY_HELP),
                ':' => {
                    command_mode = true;
                    console.begin_prompt();
                }
                _ => {}
            },
            _ => {}
        }
    };

    let summary = controller.summary();
    drop(controller);
    disable_raw_mode()?;
    console.end_line();

    state.repeat_mode = summary.repeat_mode;
    state.shuffled = summary.shuffled;
    if summary.file_path.is_some() {
        state.last_playlist = summary.file_path;
    }
    let save_result = config::save_state(&state);
    info!(repeat = ?state.repeat_mode, shuffled = state.shuffled, "session ended");
    result?;
    save_result?;
    Ok(())
}

/// Runs one `:` command. Returns a status line when the command itself has
/// something to report; player operations report through their events.
fn run_command(player: &dyn Player, raw: &str) -> Option<String> {
    let input = raw.trim();
    if input.is_empty() {
        return Some(String::from("No command"));
    }

    let mut command_split = input.splitn(2, char::is_whitespace);
    let command = command_split.next().unwrap_or_default();
    let rest = command_split.next().unwrap_or("").trim();

    match command {
        "help" => Some(KEY_HELP.join("\r\n")),
        "import" => {
            if rest.is_empty() {
                return Some(String::from("Usage: import <folder|playlist file>"));
            }
            let path = Path::new(rest);
            if path.is_dir() {
                player.import_folder(path);
            } else {
                player.import_playlist(path);
            }
            None
        }
        "export" => {
            if rest.is_empty() {
                return Some(String::from("Usage: export <playlist file>"));
            }
            player.export_playlist(Path::new(rest));
            None
        }
        "add" => {
            if rest.is_empty() {
                return Some(String::from("Usage: add <track file>"));
            }
            player.add_track(Path::new(rest));
            None
        }
        "remove" => match rest.parse::<usize>() {
            Ok(position) if position > 0 => {
                player.remove_track(position - 1);
                None
            }
            _ => Some(String::from("Usage: remove <track number>")),
        },
        _ => Some(String::from("Unknown command. Use :help")),
    }
}

fn format_listing(summary: &PlaylistSummary) -> Vec<String> {
    let mut lines = Vec::with_capacity(summary.tracks.len() + 2);
    if summary.description.is_empty() {
        lines.push(format!("Playlist '{}'", summary.name));
    } else {
        lines.push(format!("Playlist '{}' - {}", summary.name, summary.description));
    }

    if summary.tracks.is_empty() {
        lines.push(String::from("  (no tracks)"));
    }
    for (idx, label) in summary.tracks.iter().enumerate() {
        let marker = if summary.current == Some(idx) { '>' } else { ' ' };
        lines.push(format!("{marker} {:>3}. {label}", idx + 1));
    }

    lines.push(format!(
        "{} | shuffle {} | {:?}",
        summary.repeat_mode.label(),
        if summary.shuffled { "on" } else { "off" },
        summary.transport
    ));
    lines
}

/// Maps a controller event to the colored line shown for it.
/// Content units are streamed inline and have no line of their own.
fn describe(event: &PlayerEvent) -> Option<(Color, String)> {
    let line = match event {
        PlayerEvent::Content(_) => return None,
        PlayerEvent::PlaylistLoaded { name, tracks } => {
            (Color::Cyan, format!("Loaded playlist '{name}' ({tracks} tracks)"))
        }
        PlayerEvent::Playing(track) => (Color::Green, format!("Playing {track}")),
        PlayerEvent::Paused => (Color::Yellow, String::from("Paused")),
        PlayerEvent::NowPlaying(track) => (Color::Cyan, format!(">> {track}")),
        PlayerEvent::TrackFinished(track) => (Color::DarkGrey, format!("Finished {track}")),
        PlayerEvent::Selected(track) => (Color::Green, format!("Selected {track}")),
        PlayerEvent::EndOfPlaylist => (
            Color::Yellow,
            String::from("End of playlist. Press Z to play it again."),
        ),
        PlayerEvent::NoTrack => (Color::Yellow, String::from("No track to play")),
        PlayerEvent::ShuffleChanged(on) => (
            Color::Magenta,
            format!("Shuffle {}", if *on { "on" } else { "off" }),
        ),
        PlayerEvent::RepeatChanged(mode) => (Color::Magenta, format!("Mode: {}", mode.label())),
        PlayerEvent::TrackAdded(track) => (Color::Green, format!("Added {track}")),
        PlayerEvent::TrackRemoved(track) => (Color::Yellow, format!("Removed {track}")),
        PlayerEvent::DuplicatesRemoved(count) => {
            (Color::Yellow, format!("Removed {count} duplicate track(s)"))
        }
        PlayerEvent::Exported(path) => {
            (Color::Green, format!("Exported playlist to {}", path.display()))
        }
        PlayerEvent::Status(message) => (Color::White, message.clone()),
        PlayerEvent::Error(message) => (Color::Red, format!("error: {message}")),
        PlayerEvent::ShuttingDown => (Color::DarkGrey, String::from("Shutting down")),
    };
    Some(line)
}

/// Writes events to the raw-mode terminal, so every line ends in `\r\n`.
#[derive(Debug, Default)]
struct ConsoleSink {
    // Set while streamed content or a prompt left the cursor mid-line.
    mid_line: AtomicBool,
}

impl ConsoleSink {
    fn line(&self, color: Color, text: &str) {
        self.lines(color, &[text]);
    }

    fn lines<S: AsRef<str>>(&self, color: Color, lines: &[S]) {
        let mut out = stdout().lock();
        let mut result = Ok(());
        if self.mid_line.swap(false, Ordering::AcqRel) {
            result = queue!(out, Print("\r\n"));
        }
        for line in lines {
            if result.is_err() {
                break;
            }
            result = queue!(
                out,
                SetForegroundColor(color),
                Print(line.as_ref()),
                ResetColor,
                Print("\r\n")
            );
        }
        if let Err(err) = result.and_then(|()| out.flush()) {
            warn!(error = %err, "console write failed");
        }
    }

    fn echo(&self, text: &str) {
        self.mid_line.store(true, Ordering::Release);
        let mut out = stdout().lock();
        if let Err(err) = execute!(out, Print(text)) {
            warn!(error = %err, "console write failed");
        }
    }

    fn begin_prompt(&self) {
        self.end_line();
        self.echo(":");
    }

    fn end_line(&self) {
        if self.mid_line.swap(false, Ordering::AcqRel) {
            let mut out = stdout().lock();
            if let Err(err) = execute!(out, Print("\r\n")) {
                warn!(error = %err, "console write failed");
            }
        }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: PlayerEvent) {
        if let PlayerEvent::Content(unit) = event {
            self.echo(&unit.to_string());
            return;
        }
        if let Some((color, text)) = describe(&event) {
            self.line(color, &text);
        }
    }
}
