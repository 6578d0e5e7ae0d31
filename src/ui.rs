use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::app::App;
use crate::movement::MovementKey;
use crate::shot::{ShotResult, ShotType};

const PANEL_BG: Color = Color::Rgb(0x20, 0x20, 0x20);

/// Parse a `#rrggbb` string; anything else renders white.
pub fn hex_color(hex: &str) -> Color {
    let parse = |range: std::ops::Range<usize>| {
        hex.get(range).and_then(|s| u8::from_str_radix(s, 16).ok())
    };
    match (hex.len(), hex.starts_with('#')) {
        (7, true) => match (parse(1..3), parse(3..5), parse(5..7)) {
            (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
            _ => Color::White,
        },
        _ => Color::White,
    }
}

fn ms(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Text lines the overlay shows for a shot.
pub fn shot_lines(shot: &ShotResult) -> Vec<String> {
    let wire = shot.to_wire_form();
    match shot.shot_type {
        ShotType::RunAndGun if shot.has_stop_data() => vec![
            "RUN & GUN".to_string(),
            format!("{:<10} {} ms", "Stop Diff", ms(wire.diff)),
            format!("{:<10} {} ms", "Shot Delay", ms(wire.delay)),
        ],
        ShotType::RunAndGun => vec!["RUN & GUN".to_string()],
        ShotType::Static => vec!["STATIC / IDLE".to_string()],
        ShotType::Overlap | ShotType::EarlyRelease => {
            let label = if shot.shot_type == ShotType::Overlap {
                "Overlap"
            } else {
                "Gap"
            };
            vec![
                format!("{:<10} {} ms", label, ms(wire.diff)),
                format!("{:<10} {} ms", "Shot Delay", ms(wire.delay)),
            ]
        }
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let dim = Style::default().add_modifier(Modifier::DIM);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),
                Constraint::Length(1),
                Constraint::Length(2),
            ])
            .split(area);

        let (lines, color) = match self.latest_shot() {
            Some(shot) => (shot_lines(&shot), hex_color(shot.color)),
            None => (vec!["Waiting...".to_string()], Color::White),
        };
        let text: Vec<Line> = lines
            .into_iter()
            .map(|l| Line::from(Span::styled(l, bold.fg(color))))
            .collect();
        Paragraph::new(text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("cStrafe")
                    .style(Style::default().bg(PANEL_BG)),
            )
            .alignment(Alignment::Left)
            .render(chunks[0], buf);

        let held = self.session().held_keys();
        let keys: Vec<Span> = MovementKey::ALL
            .iter()
            .map(|k| {
                let label = format!(" {} ", self.bindings.label(*k));
                if held.contains(k) {
                    Span::styled(label, bold.fg(Color::Black).bg(Color::Yellow))
                } else {
                    Span::styled(label, dim)
                }
            })
            .collect();
        Paragraph::new(Line::from(keys))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);

        let mut footer = vec![Line::from(Span::styled(
            "click to shoot | (esc)ape to quit",
            dim.add_modifier(Modifier::ITALIC),
        ))];
        if !self.releases_reported {
            footer.push(Line::from(Span::styled(
                "terminal does not report key releases: keys will look held",
                Style::default().fg(Color::Yellow),
            )));
        } else if let Some(addr) = self.hud_addr {
            footer.push(Line::from(Span::styled(
                format!("HUD at http://{addr}"),
                Style::default().fg(Color::Cyan),
            )));
        }
        Paragraph::new(footer)
            .alignment(Alignment::Center)
            .render(chunks[2], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::KeyBindings;
    use crate::session::InputSession;
    use crate::shot::{CLEAN_STOP_COLOR, LOOSE_STOP_COLOR, RUN_AND_GUN_COLOR, STATIC_COLOR};
    use crate::sink::LatestShot;
    use std::sync::Arc;

    fn create_test_app() -> App {
        let latest = LatestShot::new();
        let session = Arc::new(InputSession::default().with_sink(latest.clone()));
        App::new(session, latest, KeyBindings::default())
    }

    fn rendered(app: &App, area: Rect) -> String {
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color(RUN_AND_GUN_COLOR), Color::Rgb(0xff, 0x44, 0x44));
        assert_eq!(hex_color(CLEAN_STOP_COLOR), Color::Rgb(0x22, 0x8b, 0x22));
        assert_eq!(hex_color("#zzzzzz"), Color::White);
        assert_eq!(hex_color("fff"), Color::White);
    }

    #[test]
    fn test_shot_lines() {
        let run = ShotResult {
            shot_type: ShotType::RunAndGun,
            color: RUN_AND_GUN_COLOR,
            magnitude: Some(10.4),
            delay: Some(40.9),
        };
        assert_eq!(
            shot_lines(&run),
            vec!["RUN & GUN", "Stop Diff  10 ms", "Shot Delay 40 ms"]
        );

        let bare = ShotResult::bare(ShotType::RunAndGun, RUN_AND_GUN_COLOR);
        assert_eq!(shot_lines(&bare), vec!["RUN & GUN"]);

        let gap = ShotResult {
            shot_type: ShotType::EarlyRelease,
            color: LOOSE_STOP_COLOR,
            magnitude: Some(200.0),
            delay: Some(200.0),
        };
        assert_eq!(
            shot_lines(&gap),
            vec!["Gap        200 ms", "Shot Delay 200 ms"]
        );

        let idle = ShotResult::bare(ShotType::Static, STATIC_COLOR);
        assert_eq!(shot_lines(&idle), vec!["STATIC / IDLE"]);
    }

    #[test]
    fn test_ui_widget_waiting() {
        let app = create_test_app();
        let out = rendered(&app, Rect::new(0, 0, 60, 12));
        assert!(out.contains("Waiting..."));
        assert!(out.contains(" W "));
    }

    #[test]
    fn test_ui_widget_after_shot() {
        let app = create_test_app();
        app.session().on_press(MovementKey::Left, 0.0);
        app.session().on_click(10.0);
        let out = rendered(&app, Rect::new(0, 0, 60, 12));
        assert!(out.contains("RUN & GUN"));
    }

    #[test]
    fn test_ui_widget_warnings_and_hud() {
        let mut app = create_test_app();
        app.hud_addr = Some("127.0.0.1:8000".parse().unwrap());
        let out = rendered(&app, Rect::new(0, 0, 60, 12));
        assert!(out.contains("HUD at http://127.0.0.1:8000"));

        app.releases_reported = false;
        let out = rendered(&app, Rect::new(0, 0, 80, 12));
        assert!(out.contains("key releases"));
    }

    #[test]
    fn test_ui_widget_small_area() {
        let app = create_test_app();
        let _ = rendered(&app, Rect::new(0, 0, 10, 3));
    }
}
