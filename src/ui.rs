use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph, Widget},
};

use crate::session::{
    DifficultyTier, Position, SessionConfig, SessionEvent, SessionOutcome, SessionSnapshot,
};

const TITLE: &str = "Vale";
const ORANGE: Color = Color::Rgb(214, 163, 18);
/// Avatar pixels per terminal cell; cells are roughly twice as tall as wide.
const PX_PER_COLUMN: u16 = 16;
const PX_PER_ROW: u16 = 32;

/// What the screen shows. Only ever updated from session events.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub score: u64,
    pub high_score: u64,
    pub seconds_left: u64,
    pub position: Position,
    pub shrunk: bool,
    pub playing: bool,
    pub tier: DifficultyTier,
    pub last_result: Option<(SessionOutcome, u64)>,
    avatar_full: (u16, u16),
    avatar_shrunk: (u16, u16),
}

impl View {
    pub fn new(snapshot: &SessionSnapshot, config: &SessionConfig) -> Self {
        let state = &snapshot.state;
        Self {
            score: state.score,
            high_score: state.high_score,
            seconds_left: state.whole_seconds_remaining(),
            position: state.position,
            shrunk: state.shrunk,
            playing: state.running,
            tier: state.tier,
            last_result: snapshot.last_outcome.map(|o| (o, state.score)),
            avatar_full: config.avatar_full_size,
            avatar_shrunk: config.avatar_shrunk_size,
        }
    }

    pub fn apply(&mut self, event: &SessionEvent) {
        match *event {
            SessionEvent::ScoreChanged { score, high_score } => {
                self.score = score;
                self.high_score = high_score;
            }
            SessionEvent::TimerChanged(secs) => self.seconds_left = secs,
            SessionEvent::PositionChanged(position) => self.position = position,
            SessionEvent::AvatarScaleChanged { shrunk } => self.shrunk = shrunk,
            SessionEvent::PlayStateChanged { playing } => {
                self.playing = playing;
                if playing {
                    self.tier = DifficultyTier::Normal;
                    self.last_result = None;
                }
            }
            SessionEvent::DifficultyChanged(tier) => self.tier = tier,
            SessionEvent::SpeedUp => {}
            SessionEvent::SessionEnded {
                outcome,
                score,
                high_score,
            } => {
                self.high_score = high_score;
                self.last_result = Some((outcome, score));
            }
        }
    }

    fn avatar_cells(&self) -> (u16, u16) {
        let (w, h) = if self.shrunk {
            self.avatar_shrunk
        } else {
            self.avatar_full
        };
        ((w / PX_PER_COLUMN).max(1), (h / PX_PER_ROW).max(1))
    }

    /// Avatar bounds inside `playfield`, centred on the position fraction.
    /// Vertical fractions count from the bottom edge.
    pub fn avatar_rect(&self, playfield: Rect) -> Rect {
        let (w, h) = self.avatar_cells();
        let w = w.min(playfield.width);
        let h = h.min(playfield.height);

        let cx = playfield.x as f64 + self.position.x * playfield.width as f64;
        let cy = playfield.y as f64 + (1.0 - self.position.y) * playfield.height as f64;
        let x = (cx - w as f64 / 2.0).round().max(playfield.x as f64) as u16;
        let y = (cy - h as f64 / 2.0).round().max(playfield.y as f64) as u16;

        Rect::new(
            x.min(playfield.right() - w),
            y.min(playfield.bottom() - h),
            w,
            h,
        )
    }

    /// True when a click at (`column`, `row`) of a frame of size `area` lands on the avatar.
    pub fn hits_avatar(&self, area: Rect, column: u16, row: u16) -> bool {
        if !self.playing {
            return false;
        }
        let avatar = self.avatar_rect(playfield(area));
        column >= avatar.left()
            && column < avatar.right()
            && row >= avatar.top()
            && row < avatar.bottom()
    }
}

fn sections(area: Rect) -> (Rect, Rect, Rect) {
    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .split(area);
    (chunks[0], chunks[1], chunks[2])
}

/// Inner area of the bordered playfield for a frame of size `area`.
pub fn playfield(area: Rect) -> Rect {
    let (_, field, _) = sections(area);
    Block::bordered().inner(field)
}

impl Widget for &View {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (top, field, controls) = sections(area);
        let bold = Style::default().add_modifier(Modifier::BOLD);

        let columns = Layout::horizontal([Constraint::Ratio(1, 3); 3]).split(top);
        Paragraph::new(format!("Score: {} / Record: {}", self.score, self.high_score))
            .render(columns[0], buf);
        Paragraph::new(Span::styled(TITLE, bold.fg(ORANGE)))
            .alignment(Alignment::Center)
            .render(columns[1], buf);
        Paragraph::new(format!("Time: {}s", self.seconds_left))
            .alignment(Alignment::Right)
            .render(columns[2], buf);

        let border = match self.tier {
            DifficultyTier::Hard if self.playing => Style::default().fg(Color::Red),
            _ => Style::default().add_modifier(Modifier::DIM),
        };
        let block = Block::bordered().border_style(border);
        let inner = block.inner(field);
        block.render(field, buf);

        if self.playing {
            let avatar = self.avatar_rect(inner);
            let face = if avatar.width >= 5 { "(o_o)" } else { "o" };
            let rows = avatar.height as usize;
            let lines: Vec<Line> = (0..rows)
                .map(|i| if i == rows / 2 { Line::from(face) } else { Line::default() })
                .collect();
            Paragraph::new(lines)
                .style(Style::default().bg(ORANGE).fg(Color::Black))
                .alignment(Alignment::Center)
                .render(avatar, buf);
        } else if let Some((outcome, score)) = self.last_result {
            let headline = match outcome {
                SessionOutcome::Expired => "Time!",
                SessionOutcome::Stopped => "Stopped",
            };
            let message = vec![
                Line::from(Span::styled(headline, bold)),
                Line::from(format!("Score: {score}")),
            ];
            let middle = Rect::new(
                inner.x,
                inner.y + inner.height.saturating_sub(2) / 2,
                inner.width,
                inner.height.min(2),
            );
            Paragraph::new(message)
                .alignment(Alignment::Center)
                .render(middle, buf);
        }

        let hint = if self.playing {
            "[space] stop   [q] quit"
        } else {
            "[space] play   [q] quit"
        };
        Paragraph::new(Span::styled(hint, Style::default().add_modifier(Modifier::ITALIC)))
            .alignment(Alignment::Center)
            .render(controls, buf);
    }
}
