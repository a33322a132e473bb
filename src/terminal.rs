// SPDX-License-Identifier: GPL-3.0-only

//! Terminal camera screen
//!
//! Renders the preview, the gallery and the asset viewer with Unicode
//! half-block characters for double vertical resolution. Terminal focus
//! events stand in for the app going to the background and coming back.

use crate::app::view::{RecordingIndicator, ScreenView, ViewerContent, format_elapsed, view};
use crate::app::{AppModel, Dispatcher, Message, Viewer};
use crate::backends::camera::types::Facing;
use crate::backends::frames::{FrameSlot, PreviewFrame};
use crate::config::Config;
use crate::constants::timing;
use crate::storage::MediaKind;

use crossterm::{
    event::{
        self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Clear, List, ListItem, ListState, Widget},
};
use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Run the terminal camera screen until the user quits
pub fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    let mut model = AppModel::from_config(config);
    let mut dispatcher = Dispatcher::new();

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = {
        let _guard = runtime.enter();
        run_app(&mut terminal, &mut model, &mut dispatcher)
    };

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    // Release devices through the controller, then make sure nothing is left open
    let closed = runtime.block_on(async {
        tokio::time::timeout(
            timing::SHUTDOWN_TIMEOUT,
            dispatcher.run(&mut model, Message::ScreenClosed),
        )
        .await
    });
    if closed.is_err() {
        warn!("Timed out releasing devices");
    }
    model.teardown();

    result
}

/// Key bindings shown in the help line
const HELP: &str = "space shutter | s switch | f flash | m mode | g gallery | x dismiss | q quit";

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    model: &mut AppModel,
    dispatcher: &mut Dispatcher,
) -> Result<(), Box<dyn std::error::Error>> {
    dispatcher.dispatch(model, Message::ScreenEntered);

    let mut photos = PhotoCache::default();
    let mut gallery_state = ListState::default();
    let mut show_help = false;

    loop {
        dispatcher.pump(model);

        let screen = view(model);
        let frame = match &model.viewer {
            Some(Viewer::Photo(asset)) => photos.get(&asset.path),
            Some(Viewer::Video { .. }) => model.player_frame(),
            None => model.preview_frame(),
        };
        let mirror = model.viewer.is_none() && screen.facing == Facing::Front;

        if let Some(tiles) = &screen.gallery {
            let selected = gallery_state.selected().unwrap_or(0);
            gallery_state.select((!tiles.is_empty()).then(|| selected.min(tiles.len() - 1)));
        }

        terminal.draw(|f| {
            let [top, middle, bottom] = Layout::vertical([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .areas(f.area());

            f.render_widget(TopBar { screen: &screen }, top);
            f.render_widget(
                FrameWidget {
                    frame: frame.as_deref(),
                    mirror,
                    placeholder: placeholder(&screen),
                },
                middle,
            );

            if let Some(tiles) = &screen.gallery
                && screen.viewer.is_none()
            {
                let width = (middle.width / 3).max(24).min(middle.width);
                let panel = Rect {
                    x: middle.x + middle.width - width,
                    width,
                    ..middle
                };
                let items: Vec<ListItem> = tiles
                    .iter()
                    .map(|tile| {
                        let icon = match tile.kind {
                            MediaKind::Photo => "▣",
                            MediaKind::Video => "▶",
                        };
                        ListItem::new(format!("{} {}", icon, tile.label))
                    })
                    .collect();
                let title = format!(" Gallery ({}) ", tiles.len());
                let list = List::new(items)
                    .block(Block::bordered().title(title))
                    .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
                f.render_widget(Clear, panel);
                f.render_stateful_widget(list, panel, &mut gallery_state);
            }

            let message = match (&screen.error, show_help) {
                (Some(error), _) => format!("{} (x to dismiss)", error),
                (None, true) => HELP.to_string(),
                (None, false) => controls_hint(&screen),
            };
            f.render_widget(
                StatusBar {
                    message: &message,
                    error: screen.error.is_some(),
                },
                bottom,
            );
        })?;

        // Handle input with timeout for frame updates
        if !event::poll(timing::TERMINAL_POLL)? {
            continue;
        }
        match event::read()? {
            Event::FocusLost => dispatcher.dispatch(model, Message::AppBackgrounded),
            Event::FocusGained => dispatcher.dispatch(model, Message::AppResumed),
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if is_quit(&key) {
                    info!("Quit requested");
                    break;
                }
                match key.code {
                    KeyCode::Char('h') => show_help = !show_help,
                    KeyCode::Up if screen.gallery.is_some() => gallery_state.select_previous(),
                    KeyCode::Down if screen.gallery.is_some() => gallery_state.select_next(),
                    _ => {
                        if let Some(message) = key_message(&key, &screen, model, &gallery_state) {
                            dispatcher.dispatch(model, message);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    Ok(())
}

fn is_quit(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('q')
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

/// Translate a key press into a controller message
fn key_message(
    key: &KeyEvent,
    screen: &ScreenView,
    model: &AppModel,
    gallery_state: &ListState,
) -> Option<Message> {
    match key.code {
        KeyCode::Char(' ') | KeyCode::Char('p') => Some(Message::ShutterTapped),
        KeyCode::Char('s') => Some(Message::ToggleFacing),
        KeyCode::Char('f') => Some(Message::ToggleFlash),
        KeyCode::Char('m') => Some(Message::ToggleMode),
        KeyCode::Char('g') => Some(Message::ToggleGallery),
        KeyCode::Char('r') if screen.gallery.is_some() => Some(Message::RefreshGallery),
        KeyCode::Char('x') => Some(Message::DismissError),
        KeyCode::Enter if screen.gallery.is_some() && screen.viewer.is_none() => {
            let index = gallery_state.selected()?;
            model
                .gallery
                .assets
                .get(index)
                .cloned()
                .map(Message::OpenAsset)
        }
        KeyCode::Esc if screen.viewer.is_some() => Some(Message::CloseAsset),
        KeyCode::Esc if screen.gallery.is_some() => Some(Message::ToggleGallery),
        KeyCode::Esc => Some(Message::DismissError),
        _ => None,
    }
}

/// Text shown in the frame area when there is no frame
fn placeholder(screen: &ScreenView) -> String {
    match &screen.viewer {
        Some(viewer) => match viewer.content {
            ViewerContent::VideoLoading => format!("Opening {}...", viewer.title),
            ViewerContent::VideoFailed => format!("Cannot play {}", viewer.title),
            ViewerContent::Photo | ViewerContent::VideoPlaying => viewer.title.clone(),
        },
        None => screen.status_label.clone(),
    }
}

/// Hint line listing the enabled controls
fn controls_hint(screen: &ScreenView) -> String {
    if screen.viewer.is_some() {
        return "esc close | q quit".to_string();
    }
    if screen.gallery.is_some() {
        return "up/down select | enter open | r refresh | esc close | q quit".to_string();
    }

    let mut parts = Vec::new();
    if screen.controls.shutter {
        parts.push(format!("space {}", screen.shutter_label.to_lowercase()));
    }
    if screen.controls.switch_camera {
        parts.push("s switch".to_string());
    }
    if screen.controls.flash {
        parts.push(format!("f flash {}", screen.flash));
    }
    if screen.controls.mode {
        parts.push(format!("m mode ({})", screen.mode));
    }
    parts.push("g gallery".to_string());
    parts.push("h help".to_string());
    parts.join(" | ")
}

/// Decoded photo for the viewer, keyed by path
///
/// Decoding runs on the blocking pool; the viewer shows the placeholder until
/// the frame lands in the slot. Needs a tokio runtime context.
#[derive(Default)]
struct PhotoCache {
    entry: Option<(PathBuf, FrameSlot)>,
}

impl PhotoCache {
    fn get(&mut self, path: &Path) -> Option<Arc<PreviewFrame>> {
        match &self.entry {
            Some((cached, slot)) if cached == path => slot.latest(),
            _ => {
                let slot = FrameSlot::new();
                let target = slot.clone();
                let owned = path.to_path_buf();
                tokio::task::spawn_blocking(move || {
                    if let Some(frame) = load_photo(&owned) {
                        target.store(frame);
                    }
                });
                self.entry = Some((path.to_path_buf(), slot));
                None
            }
        }
    }
}

fn load_photo(path: &Path) -> Option<PreviewFrame> {
    let image = match image::open(path) {
        Ok(image) => image.to_rgba8(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to open photo");
            return None;
        }
    };
    let (width, height) = image.dimensions();
    Some(PreviewFrame {
        width,
        height,
        data: Arc::from(image.into_raw().into_boxed_slice()),
        captured_at: Instant::now(),
    })
}

/// Widget that renders a frame using half-block characters
struct FrameWidget<'a> {
    frame: Option<&'a PreviewFrame>,
    mirror: bool,
    placeholder: String,
}

impl Widget for FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = self.frame.filter(|f| f.width > 0 && f.height > 0) else {
            let msg = self.placeholder.as_str();
            let x = area.x + (area.width.saturating_sub(msg.chars().count() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };

        // Each terminal cell displays 2 vertical pixels
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            let h = term_height;
            let w = h * frame_aspect;
            (w as u16, (h / 2.0) as u16)
        } else {
            let w = term_width;
            let h = w / frame_aspect;
            (w as u16, (h / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;
        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height * 2) as f64;

        for ty in 0..display_height {
            for tx in 0..display_width {
                let column = if self.mirror {
                    display_width - 1 - tx
                } else {
                    tx
                };
                let src_x = (column as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                let Some(cell) = buf.cell_mut((x_offset + tx, y_offset + ty)) else {
                    continue;
                };
                cell.set_char('▀');
                cell.set_fg(rgb(frame.pixel(src_x, src_y_top)));
                cell.set_bg(rgb(frame.pixel(src_x, src_y_bottom)));
            }
        }
    }
}

fn rgb([r, g, b, _]: [u8; 4]) -> Color {
    Color::Rgb(r, g, b)
}

/// Camera name, flash, mode and recording timer
struct TopBar<'a> {
    screen: &'a ScreenView,
}

impl Widget for TopBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let screen = self.screen;
        let base = Style::default().fg(Color::White).bg(Color::Black);
        fill(area, buf, base);

        let left = format!(
            " {} | {} | flash {}",
            screen.status_label, screen.mode, screen.flash
        );
        buf.set_stringn(area.x, area.y, &left, area.width as usize, base);

        let (indicator, style) = match screen.recording {
            RecordingIndicator::Off => return,
            RecordingIndicator::Starting => ("● starting".to_string(), base.fg(Color::Yellow)),
            RecordingIndicator::Recording(elapsed) => (
                format!("● REC {}", format_elapsed(elapsed)),
                base.fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            RecordingIndicator::Saving => ("● saving".to_string(), base.fg(Color::Yellow)),
        };
        let width = indicator.chars().count() as u16 + 1;
        if width < area.width {
            buf.set_string(area.x + area.width - width, area.y, &indicator, style);
        }
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
    error: bool,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bg = if self.error {
            Color::Red
        } else {
            Color::DarkGray
        };
        let style = Style::default().fg(Color::White).bg(bg);
        fill(area, buf, style);
        buf.set_stringn(area.x, area.y, self.message, area.width as usize, style);
    }
}

fn fill(area: Rect, buf: &mut Buffer, style: Style) {
    for x in area.x..area.x + area.width {
        if let Some(cell) = buf.cell_mut((x, area.y)) {
            cell.set_char(' ');
            cell.set_style(style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_photo_decodes_off_the_draw_loop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1000.png");
        image::RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let mut photos = PhotoCache::default();
        assert!(photos.get(&path).is_none());

        let deadline = Instant::now() + Duration::from_secs(2);
        let frame = loop {
            if let Some(frame) = photos.get(&path) {
                break frame;
            }
            assert!(Instant::now() < deadline, "photo never decoded");
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        assert_eq!((frame.width, frame.height), (4, 2));
        assert_eq!(frame.pixel(0, 0), [10, 20, 30, 255]);
    }

    #[tokio::test]
    async fn test_unreadable_photo_shows_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not a jpeg").unwrap();

        let mut photos = PhotoCache::default();
        assert!(photos.get(&path).is_none());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(photos.get(&path).is_none());
    }
}
