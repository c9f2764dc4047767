use crate::error::LocationError;
use crate::mapview::{MapViewSynchronizer, Viewport};
use crate::model::{clamp_ui_distance, Notice, SessionEvent};
use crate::orchestrator::{Loading, SessionState};
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};
use std::path::PathBuf;
use time::macros::format_description;

pub struct UiState {
    /// Latest snapshot received from the controller.
    pub session: SessionState,
    pub map: MapViewSynchronizer<Viewport>,
    /// Distance the next generate or export asks for.
    pub distance_km: f64,
    pub info: String,
    pub info_is_error: bool,
    pub show_info: bool,
    pub base_url: String,
    pub location_error: Option<LocationError>,
    /// Where GPX downloads are saved.
    pub export_dir: PathBuf,
    pub last_exported_path: Option<String>,
}

impl UiState {
    pub fn new(distance_km: f64, base_url: String, export_dir: PathBuf) -> Self {
        let distance_km = clamp_ui_distance(distance_km);
        Self {
            session: SessionState::new(distance_km),
            map: MapViewSynchronizer::new(Viewport::default()),
            distance_km,
            info: "Locating…".into(),
            info_is_error: false,
            show_info: false,
            base_url,
            location_error: None,
            export_dir,
            last_exported_path: None,
        }
    }

    pub fn can_generate(&self) -> bool {
        self.session.can_generate()
    }

    pub fn can_export(&self) -> bool {
        self.session.position.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.session.loading == Loading::Requesting
    }

    pub fn adjust_distance(&mut self, delta_km: f64) {
        self.distance_km = clamp_ui_distance(self.distance_km + delta_km);
    }

    pub fn set_info(&mut self, msg: impl Into<String>, is_error: bool) {
        self.info = format!("[{}] {}", clock(), msg.into());
        self.info_is_error = is_error;
    }

    /// Fold one controller event into the UI.
    pub fn apply_event(&mut self, ev: SessionEvent) {
        match ev {
            SessionEvent::StateChanged {
                transition,
                before,
                after,
            } => {
                self.map.on_transition(transition, &before, &after);
                self.session = *after;
            }
            SessionEvent::Notice(notice) => {
                if let Notice::Location(e) = &notice {
                    self.location_error = Some(*e);
                }
                self.set_info(notice.to_message(), notice.is_error());
            }
            SessionEvent::GpxReady { bytes } => {
                match super::export::save_gpx(&self.export_dir, &bytes) {
                    Ok(path) => {
                        let path_str = path.to_string_lossy().to_string();
                        self.set_info(
                            format!("Saved GPX: {} (press 'y' to copy path)", path.display()),
                            false,
                        );
                        self.last_exported_path = Some(path_str);
                    }
                    Err(e) => self.set_info(format!("GPX save failed: {e:#}"), true),
                }
            }
        }
    }
}

/// Local wall clock as `HH:MM:SS`, UTC when the local offset is unknown.
fn clock() -> String {
    let now = time::OffsetDateTime::now_utc();
    let now = match time::UtcOffset::current_local_offset() {
        Ok(offset) => now.to_offset(offset),
        Err(_) => now,
    };
    now.format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_default()
}

/// Push `label: value` lines, wrapping the value to the panel width.
/// Multi-line values keep their line breaks.
pub fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    status_area_width: u16,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = status_area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let mut first = true;
    for source_line in value.lines() {
        let value_chars: Vec<char> = source_line.chars().collect();
        let mut remaining = value_chars.as_slice();
        if remaining.is_empty() {
            continue;
        }

        while !remaining.is_empty() {
            let line_width = if first {
                usable_width.saturating_sub(label_width + 1).max(1)
            } else {
                usable_width.saturating_sub(2).max(1)
            };

            let chars_to_take = (remaining.len() as u16).min(line_width) as usize;
            let (line_chars, rest) = remaining.split_at(chars_to_take);
            let line_text: String = line_chars.iter().collect();

            if first {
                out.push(Line::from(vec![
                    Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                    Span::raw(" "),
                    Span::raw(line_text),
                ]));
                first = false;
            } else {
                out.push(Line::from(vec![Span::raw("  "), Span::raw(line_text)]));
            }

            remaining = rest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapview::MapView;
    use crate::model::{Coordinate, RouteGeometry};
    use crate::orchestrator::Transition;
    use bytes::Bytes;

    fn ui(dir: PathBuf) -> UiState {
        UiState::new(5.0, "http://localhost:8080".into(), dir)
    }

    fn located() -> SessionState {
        let mut s = SessionState::new(5.0);
        s.position = Some(Coordinate::new(48.85, 2.35).unwrap());
        s
    }

    #[test]
    fn distance_stays_in_control_range() {
        let mut s = ui(PathBuf::from("."));
        s.adjust_distance(100.0);
        assert_eq!(s.distance_km, 20.0);
        s.adjust_distance(-0.1);
        assert_eq!(s.distance_km, 19.9);
        s.adjust_distance(-100.0);
        assert_eq!(s.distance_km, 1.0);
    }

    #[test]
    fn position_event_enables_generate_and_recenters() {
        let mut s = ui(PathBuf::from("."));
        assert!(!s.can_generate());
        s.apply_event(SessionEvent::StateChanged {
            transition: Transition::PositionAcquired,
            before: Box::new(SessionState::new(5.0)),
            after: Box::new(located()),
        });
        assert!(s.can_generate());
        assert!(s.can_export());
        assert_eq!(s.map.view().center(), Coordinate::new(48.85, 2.35).unwrap());
    }

    #[test]
    fn loading_disables_generate_only() {
        let mut s = ui(PathBuf::from("."));
        let mut loading = located();
        loading.loading = Loading::Requesting;
        s.apply_event(SessionEvent::StateChanged {
            transition: Transition::GenerateStarted,
            before: Box::new(located()),
            after: Box::new(loading),
        });
        assert!(s.is_loading());
        assert!(!s.can_generate());
        assert!(s.can_export());
    }

    #[test]
    fn route_event_fits_map() {
        let mut s = ui(PathBuf::from("."));
        let mut after = located();
        after.route = RouteGeometry::from(vec![
            Coordinate::new(48.85, 2.35).unwrap(),
            Coordinate::new(48.87, 2.38).unwrap(),
        ]);
        s.apply_event(SessionEvent::StateChanged {
            transition: Transition::RouteReplaced,
            before: Box::new(located()),
            after: Box::new(after),
        });
        for p in s.session.route.points() {
            assert!(s.map.view().bounds().contains(*p));
        }
    }

    #[test]
    fn location_notice_is_remembered() {
        let mut s = ui(PathBuf::from("."));
        s.apply_event(SessionEvent::Notice(Notice::Location(LocationError::Denied)));
        assert_eq!(s.location_error, Some(LocationError::Denied));
        assert!(s.info_is_error);
        assert!(s.info.contains("Unable to retrieve your location"));
    }

    #[test]
    fn gpx_event_saves_route_file() {
        let tmp = tempfile::tempdir().unwrap();
        let mut s = ui(tmp.path().to_path_buf());
        s.apply_event(SessionEvent::GpxReady {
            bytes: Bytes::from_static(b"<gpx/>"),
        });
        let saved = tmp.path().join("route.gpx");
        assert_eq!(std::fs::read(&saved).unwrap(), b"<gpx/>");
        assert_eq!(
            s.last_exported_path.as_deref(),
            Some(saved.to_string_lossy().as_ref())
        );
        assert!(!s.info_is_error);
    }

    #[test]
    fn wrapped_values_keep_line_breaks() {
        let mut out = Vec::new();
        push_wrapped_status_kv(&mut out, "Error", "{\n  \"error\": \"x\"\n}", 40);
        assert_eq!(out.len(), 3);
        push_wrapped_status_kv(&mut out, "Empty", "   ", 40);
        assert_eq!(out.len(), 3);
    }
}
