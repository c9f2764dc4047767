use super::state::UiState;
use crate::mapview::{MapLayers, Viewport};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    text::{Line, Span},
    widgets::canvas::{Canvas, Line as CanvasLine, Map, MapResolution},
    widgets::{Block, Borders},
    Frame,
};

/// Latitude span per longitude span that keeps the drawing undistorted in
/// `area`. Terminal cells are about twice as tall as they are wide.
pub fn aspect_for(area: Rect, center_lat: f64) -> f64 {
    let cols = f64::from(area.width.saturating_sub(2).max(1));
    let rows = f64::from(area.height.saturating_sub(2).max(1));
    (2.0 * rows / cols) * center_lat.to_radians().cos().max(0.05)
}

pub fn draw_map(area: Rect, f: &mut Frame, state: &UiState) {
    let view: &Viewport = state.map.view();
    let bounds = view.bounds();
    let layers = state.map.layers(&state.session);

    let title = if layers.stale {
        Line::from(vec![
            Span::raw("Map "),
            Span::styled("(route predates cache reset)", Style::default().fg(Color::Yellow)),
        ])
    } else {
        Line::from("Map")
    };

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .marker(symbols::Marker::Braille)
        .x_bounds([bounds.west, bounds.east])
        .y_bounds([bounds.south, bounds.north])
        .paint(move |ctx| {
            ctx.draw(&Map {
                color: Color::DarkGray,
                resolution: MapResolution::High,
            });
            ctx.layer();
            paint_route(ctx, &layers);
        });
    f.render_widget(canvas, area);
}

fn paint_route(ctx: &mut ratatui::widgets::canvas::Context<'_>, layers: &MapLayers<'_>) {
    if let Some(points) = layers.polyline {
        let color = if layers.stale { Color::Gray } else { Color::Cyan };
        for leg in points.windows(2) {
            ctx.draw(&CanvasLine::new(leg[0].lon, leg[0].lat, leg[1].lon, leg[1].lat, color));
        }
    }
    if let Some(p) = layers.marker {
        ctx.print(p.lon, p.lat, Span::styled("●", Style::default().fg(Color::Red)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_grows_with_height_and_shrinks_with_latitude() {
        let wide = aspect_for(Rect::new(0, 0, 82, 22), 0.0);
        let tall = aspect_for(Rect::new(0, 0, 42, 42), 0.0);
        assert!(tall > wide);
        assert!((wide - 0.5).abs() < 1e-9);

        let north = aspect_for(Rect::new(0, 0, 82, 22), 60.0);
        assert!((north - 0.25).abs() < 1e-9);
    }
}
