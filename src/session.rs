use rand::Rng;
use std::ops::RangeInclusive;

use crate::config::Variant;

/// Horizontal placement of the avatar, in whole percent of the playfield width.
pub const X_PERCENT: RangeInclusive<u32> = 10..=90;
/// Vertical placement of the avatar, in whole percent of the playfield height.
pub const Y_PERCENT: RangeInclusive<u32> = 15..=85;
/// Interval between countdown steps at the start of every session, in seconds.
pub const INITIAL_TICK_SECS: f64 = 1.0;

/// Immutable template for every session a controller runs.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub playtime_secs: f64,
    pub avatar_full_size: (u16, u16),
    pub avatar_shrunk_size: (u16, u16),
    /// Fixed RNG seed; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl SessionConfig {
    pub fn new(playtime_secs: f64) -> Self {
        Self::for_variant(Variant::Classic).with_playtime(playtime_secs)
    }

    pub fn for_variant(variant: Variant) -> Self {
        let full = variant.avatar_size();
        Self {
            playtime_secs: variant.playtime_secs(),
            avatar_full_size: full,
            avatar_shrunk_size: (full.0 / 2, full.1 / 2),
            seed: None,
        }
    }

    pub fn with_playtime(mut self, playtime_secs: f64) -> Self {
        self.playtime_secs = playtime_secs;
        self
    }

    /// Sets the full avatar size; the shrunk size follows at half of it.
    pub fn with_avatar_size(mut self, width: u16, height: u16) -> Self {
        self.avatar_full_size = (width, height);
        self.avatar_shrunk_size = (width / 2, height / 2);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.playtime_secs.is_finite() || self.playtime_secs <= 0.0 {
            return Err(format!(
                "playtime must be a positive number of seconds, got {}",
                self.playtime_secs
            ));
        }
        Ok(())
    }

    pub fn avatar_size(&self, shrunk: bool) -> (u16, u16) {
        if shrunk {
            self.avatar_shrunk_size
        } else {
            self.avatar_full_size
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::for_variant(Variant::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DifficultyTier {
    #[default]
    Normal,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
}

/// How a session left the `Running` phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The countdown reached zero.
    Expired,
    /// The player (or a new `start`) ended it early.
    Stopped,
}

/// Avatar centre as fractions of the playfield extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const CENTER: Position = Position { x: 0.5, y: 0.5 };

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            x: rng.gen_range(X_PERCENT) as f64 / 100.0,
            y: rng.gen_range(Y_PERCENT) as f64 / 100.0,
        }
    }

    pub fn in_bounds(&self) -> bool {
        let x = (*X_PERCENT.start() as f64 / 100.0)..=(*X_PERCENT.end() as f64 / 100.0);
        let y = (*Y_PERCENT.start() as f64 / 100.0)..=(*Y_PERCENT.end() as f64 / 100.0);
        x.contains(&self.x) && y.contains(&self.y)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::CENTER
    }
}

/// What a single countdown step changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub expired: bool,
    pub became_hard: bool,
    pub sped_up: bool,
    pub repositioned: bool,
}

/// Mutable state of one session. Rebuilt on every start; `high_score`
/// is carried over from the previous session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub playtime_secs: f64,
    pub remaining_secs: f64,
    pub score: u64,
    pub high_score: u64,
    pub running: bool,
    pub tier: DifficultyTier,
    pub speed_up: bool,
    pub tick_secs: f64,
    pub position: Position,
    pub shrunk: bool,
}

impl SessionState {
    /// Idle state shown before the first session.
    pub fn idle(config: &SessionConfig, high_score: u64) -> Self {
        Self {
            playtime_secs: config.playtime_secs,
            remaining_secs: config.playtime_secs,
            score: 0,
            high_score,
            running: false,
            tier: DifficultyTier::Normal,
            speed_up: false,
            tick_secs: INITIAL_TICK_SECS,
            position: Position::CENTER,
            shrunk: false,
        }
    }

    /// Fresh running state with a newly rolled avatar position.
    pub fn fresh<R: Rng + ?Sized>(config: &SessionConfig, high_score: u64, rng: &mut R) -> Self {
        Self {
            running: true,
            position: Position::random(rng),
            ..Self::idle(config, high_score)
        }
    }

    pub fn whole_seconds_remaining(&self) -> u64 {
        self.remaining_secs.max(0.0).trunc() as u64
    }

    /// Counts a hit and moves the avatar. Returns true when the hit set a new record.
    pub fn register_hit<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        self.score += 1;
        self.position = Position::random(rng);
        if self.score > self.high_score {
            self.high_score = self.score;
            return true;
        }
        false
    }

    /// Advances the countdown by the current tick interval.
    ///
    /// Remaining time is decremented by exactly `tick_secs` (no wall-clock
    /// resampling) and clamped at zero. Hard tier starts once less than half
    /// the playtime remains; at a quarter the interval halves. Both are
    /// one-way until the next session. In hard tier every step redraws the
    /// avatar scale (shrunk two times out of three) and its position.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TickReport {
        let mut report = TickReport::default();

        self.remaining_secs = (self.remaining_secs - self.tick_secs).max(0.0);
        if self.remaining_secs <= 0.0 {
            self.running = false;
            report.expired = true;
        } else if self.remaining_secs < self.playtime_secs / 2.0
            && self.tier == DifficultyTier::Normal
        {
            self.tier = DifficultyTier::Hard;
            report.became_hard = true;
        }

        if self.remaining_secs <= self.playtime_secs / 4.0 && !self.speed_up {
            self.tick_secs /= 2.0;
            self.speed_up = true;
            report.sped_up = true;
        }

        if self.tier == DifficultyTier::Hard {
            self.shrunk = rng.gen_range(0..3) != 0;
            self.position = Position::random(rng);
            report.repositioned = true;
        }

        report
    }
}

/// Read-only view handed to the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub last_outcome: Option<SessionOutcome>,
}

impl SessionSnapshot {
    pub fn phase(&self) -> Phase {
        if self.state.running {
            Phase::Running
        } else {
            Phase::Idle
        }
    }
}

/// Notifications emitted by the controller for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ScoreChanged { score: u64, high_score: u64 },
    /// Remaining time truncated to whole seconds.
    TimerChanged(u64),
    PositionChanged(Position),
    AvatarScaleChanged { shrunk: bool },
    PlayStateChanged { playing: bool },
    DifficultyChanged(DifficultyTier),
    SpeedUp,
    SessionEnded {
        outcome: SessionOutcome,
        score: u64,
        high_score: u64,
    },
}
