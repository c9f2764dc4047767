mod export;
mod help;
mod map;
mod state;

use crate::mapview::MapView;
use crate::model::{SessionConfig, SessionEvent};
use crate::orchestrator::{self, RouteSessionController, UiCommand};
use crate::position::{Locator, PositionProvider};
use crate::service::HttpRouteService;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Terminal,
};
use state::UiState;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Fraction of the visible span one pan key moves.
const PAN_STEP: f64 = 0.1;

pub async fn run(cfg: SessionConfig) -> Result<()> {
    // Unbounded channels avoid backpressure between the UI thread and the controller.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<SessionEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let service = HttpRouteService::new(&cfg)?;
    let provider = PositionProvider::new(Locator::from_config(&cfg)?);
    let export_dir = export::default_export_dir()?;
    let ui = UiState::new(cfg.distance_km, cfg.base_url.clone(), export_dir);
    let controller = RouteSessionController::new(service, event_tx, ui.distance_km);

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(ui, event_rx, cmd_tx));

    let res = orchestrator::run_controller(&controller, provider, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    mut state: UiState,
    mut event_rx: UnboundedReceiver<SessionEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            if let Ok(size) = terminal.size() {
                let full = Rect::new(0, 0, size.width, size.height);
                let map_area = layout(full, state.show_info, status_rows(&state.info, full)).map;
                let center_lat = state.map.view().center().lat;
                state
                    .map
                    .view_mut()
                    .set_aspect(map::aspect_for(map_area, center_lat));
            }
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(cmd) = handle_key(&mut state, k) {
                    let quit = cmd == UiCommand::Quit;
                    let _ = cmd_tx.send(cmd);
                    if quit {
                        break Ok(());
                    }
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

/// Apply a key press to local UI state and return the command it triggers, if any.
fn handle_key(state: &mut UiState, k: KeyEvent) -> Option<UiCommand> {
    match (k.modifiers, k.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) | (_, KeyCode::Char('q')) => {
            return Some(UiCommand::Quit);
        }
        (_, KeyCode::Char('g')) => {
            if state.can_generate() {
                state.set_info(format!("Generating {:.1} km route…", state.distance_km), false);
                return Some(UiCommand::Generate(state.distance_km));
            }
            let why = if state.is_loading() {
                "A route request is already running"
            } else {
                "User location not set"
            };
            state.set_info(why, true);
        }
        (_, KeyCode::Char('r')) => {
            state.set_info("Resetting route cache…", false);
            return Some(UiCommand::ResetCache);
        }
        (_, KeyCode::Char('e')) => {
            if state.can_export() {
                state.set_info("Downloading GPX…", false);
                return Some(UiCommand::ExportGpx(state.distance_km));
            }
            state.set_info("User location not set", true);
        }
        (_, KeyCode::Char('i')) => state.show_info = !state.show_info,
        (_, KeyCode::Char('[')) => state.adjust_distance(-0.1),
        (_, KeyCode::Char(']')) => state.adjust_distance(0.1),
        (_, KeyCode::Char('{')) => state.adjust_distance(-1.0),
        (_, KeyCode::Char('}')) => state.adjust_distance(1.0),
        (_, KeyCode::Left) | (_, KeyCode::Char('h')) => state.map.view_mut().pan(-PAN_STEP, 0.0),
        (_, KeyCode::Right) | (_, KeyCode::Char('l')) => state.map.view_mut().pan(PAN_STEP, 0.0),
        (_, KeyCode::Up) | (_, KeyCode::Char('k')) => state.map.view_mut().pan(0.0, PAN_STEP),
        (_, KeyCode::Down) | (_, KeyCode::Char('j')) => state.map.view_mut().pan(0.0, -PAN_STEP),
        (_, KeyCode::Char('+')) | (_, KeyCode::Char('=')) => state.map.view_mut().zoom_by(1.0),
        (_, KeyCode::Char('-')) => state.map.view_mut().zoom_by(-1.0),
        (_, KeyCode::Char('c')) => {
            if state.session.position.is_some() {
                state.map.recenter(state.session.position);
            } else {
                state.set_info("User location not set", true);
            }
        }
        (_, KeyCode::Char('y')) => {
            if let Some(path) = state.last_exported_path.clone() {
                match export::copy_to_clipboard(&path) {
                    Ok(_) => {
                        let display_path = if path.chars().count() > 60 {
                            format!("{}...", path.chars().take(57).collect::<String>())
                        } else {
                            path
                        };
                        state.set_info(format!("✓ Copied to clipboard: {display_path}"), false);
                    }
                    Err(e) => state.set_info(format!("Clipboard copy failed: {e:#}"), true),
                }
            } else {
                state.set_info("No exported file path to copy. Export a route first (e)", true);
            }
        }
        _ => {}
    }
    None
}

struct Areas {
    header: Rect,
    map: Rect,
    info: Option<Rect>,
    status: Rect,
}

fn layout(area: Rect, show_info: bool, status_rows: u16) -> Areas {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(status_rows + 2),
            ]
            .as_ref(),
        )
        .split(area);

    if !show_info {
        return Areas {
            header: rows[0],
            map: rows[1],
            info: None,
            status: rows[2],
        };
    }
    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)].as_ref())
        .split(rows[1]);
    Areas {
        header: rows[0],
        map: middle[0],
        info: Some(middle[1]),
        status: rows[2],
    }
}

/// Split the status message into rows that fit inside the bordered pane.
/// Line breaks in the message are kept, so pretty-printed payloads stay readable.
fn wrap_status(info: &str, width: u16) -> Vec<String> {
    let usable = usize::from(width.saturating_sub(2).max(1));
    let mut rows = Vec::new();
    for source_line in info.lines() {
        let chars: Vec<char> = source_line.chars().collect();
        if chars.is_empty() {
            rows.push(String::new());
            continue;
        }
        rows.extend(chars.chunks(usable).map(|c| c.iter().collect::<String>()));
    }
    rows
}

/// Inner height of the status pane: one row per wrapped line, at most half the screen.
fn status_rows(info: &str, area: Rect) -> u16 {
    let wanted = u16::try_from(wrap_status(info, area.width).len()).unwrap_or(u16::MAX);
    let cap = (area.height / 2).saturating_sub(2).max(1);
    wanted.clamp(1, cap)
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let areas = layout(area, state.show_info, status_rows(&state.info, area));

    f.render_widget(
        Paragraph::new(header_line(state))
            .block(Block::default().borders(Borders::ALL).title("routefindr")),
        areas.header,
    );

    map::draw_map(areas.map, f, state);
    if let Some(info) = areas.info {
        help::draw_info(info, f, state);
    }

    let status_style = if state.info_is_error {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    let status: Vec<Line<'static>> = wrap_status(&state.info, areas.status.width)
        .into_iter()
        .map(|row| Line::from(Span::styled(row, status_style)))
        .collect();
    f.render_widget(
        Paragraph::new(status).block(Block::default().borders(Borders::ALL).title("Status")),
        areas.status,
    );
}

/// Distance control plus one entry per operation, dimmed when unavailable.
fn header_line(state: &UiState) -> Line<'static> {
    let key = Style::default().fg(Color::Magenta);
    let enabled = Style::default();
    let disabled = Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM);

    let generate_label = if state.is_loading() {
        "Generating…"
    } else {
        "Generate"
    };

    Line::from(vec![
        Span::raw("Distance "),
        Span::styled(format!("{:.1} km", state.distance_km), Style::default().fg(Color::Green)),
        Span::raw("  "),
        Span::styled("[g] ", key),
        Span::styled(
            generate_label,
            if state.can_generate() { enabled } else { disabled },
        ),
        Span::raw("  "),
        Span::styled("[r] ", key),
        Span::raw("Reset cache"),
        Span::raw("  "),
        Span::styled("[e] ", key),
        Span::styled("Export GPX", if state.can_export() { enabled } else { disabled }),
        Span::raw("  "),
        Span::styled("[i] ", key),
        Span::raw("Info"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorPayload, SessionError};
    use crate::model::{Coordinate, Notice};
    use crate::orchestrator::{Loading, SessionState};
    use ratatui::backend::TestBackend;
    use std::path::PathBuf;

    fn press(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn ui() -> UiState {
        UiState::new(5.0, "http://localhost:8080".into(), PathBuf::from("."))
    }

    fn located(state: &mut UiState) {
        let mut s = SessionState::new(5.0);
        s.position = Some(Coordinate::new(51.5, -0.09).unwrap());
        state.session = s;
    }

    #[test]
    fn generate_needs_position() {
        let mut s = ui();
        assert_eq!(handle_key(&mut s, press('g')), None);
        assert!(s.info_is_error);

        located(&mut s);
        assert_eq!(handle_key(&mut s, press('g')), Some(UiCommand::Generate(5.0)));
    }

    #[test]
    fn generate_disabled_while_loading() {
        let mut s = ui();
        located(&mut s);
        s.session.loading = Loading::Requesting;
        assert_eq!(handle_key(&mut s, press('g')), None);
        assert!(s.info.contains("already running"));
        // Reset and export are not guarded by loading.
        assert_eq!(handle_key(&mut s, press('r')), Some(UiCommand::ResetCache));
        assert_eq!(handle_key(&mut s, press('e')), Some(UiCommand::ExportGpx(5.0)));
    }

    #[test]
    fn distance_keys_feed_next_request() {
        let mut s = ui();
        located(&mut s);
        handle_key(&mut s, press('}'));
        handle_key(&mut s, press(']'));
        handle_key(&mut s, press(']'));
        handle_key(&mut s, press('['));
        assert_eq!(handle_key(&mut s, press('g')), Some(UiCommand::Generate(6.1)));
    }

    #[test]
    fn quit_keys() {
        let mut s = ui();
        assert_eq!(handle_key(&mut s, press('q')), Some(UiCommand::Quit));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key(&mut s, ctrl_c), Some(UiCommand::Quit));
    }

    #[test]
    fn pan_zoom_and_recenter_stay_local() {
        let mut s = ui();
        located(&mut s);
        let start = *s.map.view();
        assert_eq!(handle_key(&mut s, press('l')), None);
        assert_eq!(handle_key(&mut s, press('+')), None);
        assert_ne!(*s.map.view(), start);

        handle_key(&mut s, press('c'));
        assert_eq!(s.map.view().center(), Coordinate::new(51.5, -0.09).unwrap());
        assert_eq!(s.map.view().zoom(), start.zoom() + 1.0);
    }

    #[test]
    fn info_panel_splits_the_map() {
        let area = Rect::new(0, 0, 100, 40);
        assert!(layout(area, false, 1).info.is_none());
        let split = layout(area, true, 1);
        assert!(split.info.is_some());
        assert!(split.map.width < 100);
    }

    fn render(state: &UiState, width: u16, height: u16) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| draw(f.area(), f, state)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .chunks(usize::from(width))
            .map(|row| row.iter().map(|cell| cell.symbol()).collect())
            .collect()
    }

    #[test]
    fn structured_service_error_is_fully_visible() {
        let mut s = ui();
        let body = br#"{"success":false,"error":"Invalid request parameters","details":"Distance cannot exceed 50 km","timestamp":"2024-05-01T10:00:00.000Z"}"#;
        s.apply_event(SessionEvent::Notice(Notice::Failed(SessionError::Service {
            status: Some(400),
            payload: ErrorPayload::from_body(body),
        })));

        let screen = render(&s, 80, 24).join("\n");
        for field in [
            r#""success": false"#,
            r#""error": "Invalid request parameters""#,
            r#""details": "Distance cannot exceed 50 km""#,
            r#""timestamp": "2024-05-01T10:00:00.000Z""#,
        ] {
            assert!(screen.contains(field), "{field} missing from:\n{screen}");
        }
    }

    #[test]
    fn long_status_wraps_and_pane_is_capped() {
        assert_eq!(wrap_status("abcdef", 5), vec!["abc", "def"]);
        assert_eq!(wrap_status("a\n\nb", 10), vec!["a", "", "b"]);

        let area = Rect::new(0, 0, 80, 24);
        assert_eq!(status_rows("short", area), 1);
        assert_eq!(status_rows(&"x\n".repeat(50), area), 10);
        assert!(layout(area, false, 10).map.height > 0);
    }

    #[test]
    fn info_panel_reports_missing_route() {
        let mut s = ui();
        s.show_info = true;
        let screen = render(&s, 120, 40).join("\n");
        assert!(screen.contains("Route: none, 0 generated"));
    }
}
