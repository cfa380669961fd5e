use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Tabs, Widget},
};

use crate::{
    app::App,
    exercise::Exercise,
    rep_counter::Stage,
    session::Status,
    util::{fit_width, format_elapsed},
};

const HORIZONTAL_MARGIN: u16 = 2;
const HELP: &str = "s start  p stop  r reset  tab/1-4 exercise  m sound  q quit";

fn stage_style(stage: Stage) -> Style {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    match stage {
        Stage::Ready => bold.fg(Color::Gray),
        Stage::GoDown => bold.fg(Color::Green),
        Stage::GoUp => bold.fg(Color::Red),
    }
}

fn status_style(status: &Status) -> Style {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    match status {
        Status::Calibrated => bold.fg(Color::Green),
        Status::Searching | Status::Recalibrating => bold.fg(Color::Yellow),
        Status::CameraOff | Status::CaptureFailed(_) => bold.fg(Color::Red),
        Status::Idle | Status::InputEnded => bold.add_modifier(Modifier::DIM),
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let state = self.state();
        let width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2) as usize;
        let dim = Style::default().add_modifier(Modifier::DIM);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(3), // exercise tabs
                Constraint::Min(3),    // counter
                Constraint::Length(1), // stage + timer
                Constraint::Length(3), // progress
                Constraint::Length(1), // status
                Constraint::Length(1), // angle / capture info
                Constraint::Length(1), // help
            ])
            .split(area);

        let titles = Exercise::ALL.iter().enumerate().map(|(i, e)| {
            Line::from(format!("{} {}", i + 1, e.profile().name))
        });
        Tabs::new(titles)
            .select(self.exercise().index())
            .block(Block::default().borders(Borders::ALL).title("Exercise"))
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            )
            .render(chunks[0], buf);

        let counter_area = chunks[1];
        let mut counter = vec![Line::from(Span::styled(
            format!("REPS {}", state.rep_count()),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))];
        if let Some(banner) = &self.banner {
            counter.push(Line::from(Span::styled(
                format!("{}!", banner.text),
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD | Modifier::ITALIC),
            )));
        }
        // Vertically center inside the counter area
        let pad = counter_area.height.saturating_sub(counter.len() as u16) / 2;
        let counter_rect = Rect {
            y: counter_area.y + pad,
            height: counter_area.height - pad,
            ..counter_area
        };
        Paragraph::new(counter)
            .alignment(Alignment::Center)
            .render(counter_rect, buf);

        let stage = state.stage();
        Paragraph::new(Line::from(vec![
            Span::styled(stage.label(), stage_style(stage)),
            Span::raw("   "),
            Span::styled(format_elapsed(state.elapsed_seconds), dim),
        ]))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

        // max/min rather than clamp: NaN falls to 0 instead of reaching the gauge
        let percent = state.progress.max(0.0).min(100.0);
        Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Progress"))
            .gauge_style(Style::default().fg(Color::Green))
            .ratio(percent / 100.0)
            .label(format!("{percent:.0}%"))
            .render(chunks[3], buf);

        Paragraph::new(Span::styled(
            fit_width(&state.status.label(), width),
            status_style(&state.status),
        ))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);

        let angle = match state.last_angle {
            Some(angle) => format!("{angle:.0}°"),
            None => "--".to_string(),
        };
        let capture = self.config.capture;
        let mut info = format!(
            "angle {angle}  {}x{} @ {}fps  dropped {}  {}",
            capture.width,
            capture.height,
            capture.fps,
            state.dropped_frames,
            self.input.describe()
        );
        if !self.config.sound {
            info.push_str("  muted");
        }
        Paragraph::new(Span::styled(fit_width(&info, width), dim))
            .alignment(Alignment::Center)
            .render(chunks[5], buf);

        Paragraph::new(Span::styled(
            fit_width(HELP, width),
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[6], buf);
    }
}
