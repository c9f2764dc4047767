use super::state::{push_wrapped_status_kv, UiState};
use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

const KEYBINDS: &[(&str, &str)] = &[
    ("g", "Generate route"),
    ("r", "Reset route cache"),
    ("e", "Export GPX"),
    ("[ / ]", "Distance -/+ 0.1 km"),
    ("{ / }", "Distance -/+ 1 km"),
    ("←↑↓→/hjkl", "Pan"),
    ("+ / -", "Zoom"),
    ("c", "Recenter on position"),
    ("y", "Copy exported path"),
    ("i", "Toggle this panel"),
    ("q / Ctrl-C", "Quit"),
];

pub fn draw_info(area: Rect, f: &mut Frame, state: &UiState) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let s = &state.session;

    push_wrapped_status_kv(&mut lines, "Service", &state.base_url, area.width);
    let position = match (s.position, state.location_error) {
        (Some(p), _) => p.to_string(),
        (None, Some(e)) => format!("unavailable ({e})"),
        (None, None) => "locating…".to_string(),
    };
    push_wrapped_status_kv(&mut lines, "Position", &position, area.width);
    push_wrapped_status_kv(
        &mut lines,
        "Last request",
        &format!("{:.1} km", s.distance_km),
        area.width,
    );
    if let Some(km) = s.reported_distance_km {
        push_wrapped_status_kv(&mut lines, "Reported", &format!("{km:.2} km"), area.width);
    }
    let route = if s.route.is_empty() {
        format!("none, {} generated", s.generations)
    } else {
        format!("{} points, {} generated", s.route.len(), s.generations)
    };
    push_wrapped_status_kv(&mut lines, "Route", &route, area.width);
    if let Some(path) = state.last_exported_path.as_deref() {
        push_wrapped_status_kv(&mut lines, "Exported", path, area.width);
    }

    lines.push(Line::from(""));
    lines.push(Line::from("Keybinds:"));
    for (key, action) in KEYBINDS {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(format!("{key:<11}"), Style::default().fg(Color::Magenta)),
            Span::raw(*action),
        ]));
    }

    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Info"));
    f.render_widget(p, area);
}
