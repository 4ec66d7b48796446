//! Tournament aggregate

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::DomainError;
use crate::domain::shared::TournamentId;
use crate::domain::traits::Aggregate;

/// How tournament scores are sorted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            _ => Err(DomainError::Required("sort order (asc|desc)")),
        }
    }
}

/// Score submission operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    #[default]
    Best,
    Set,
    Increment,
    Decrement,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::Set => "set",
            Self::Increment => "incr",
            Self::Decrement => "decr",
        }
    }
}

impl FromStr for Operator {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best" => Ok(Self::Best),
            "set" => Ok(Self::Set),
            "incr" | "increment" => Ok(Self::Increment),
            "decr" | "decrement" => Ok(Self::Decrement),
            _ => Err(DomainError::Required("operator (best|set|incr|decr)")),
        }
    }
}

/// Tournament lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TournamentState {
    Active,
    Ended,
    Reset,
}

impl TournamentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ended => "ended",
            Self::Reset => "reset",
        }
    }
}

impl fmt::Display for TournamentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw intake for [`Tournament::new`]. Numeric fields are signed so that
/// negative input can be reported instead of wrapping.
#[derive(Debug, Clone)]
pub struct TournamentDraft {
    pub id: TournamentId,
    pub title: String,
    pub description: String,
    pub category: i64,
    pub sort_order: SortOrder,
    pub operator: Operator,
    pub reset_schedule: String,
    pub authoritative: bool,
    pub join_required: bool,
    pub max_size: i64,
    pub max_num_score: i64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Duration,
}

impl Default for TournamentDraft {
    fn default() -> Self {
        Self {
            id: TournamentId::default(),
            title: String::new(),
            description: String::new(),
            category: 0,
            sort_order: SortOrder::default(),
            operator: Operator::default(),
            reset_schedule: String::new(),
            authoritative: false,
            join_required: false,
            max_size: 0,
            max_num_score: 0,
            start_time: None,
            end_time: None,
            duration: Duration::zero(),
        }
    }
}

/// A competitive event, created once on intake and mutated only through
/// [`Tournament::end`] and [`Tournament::reset`].
#[derive(Debug, Clone, PartialEq)]
pub struct Tournament {
    pub id: TournamentId,
    pub title: String,
    pub description: String,
    pub category: u32,
    pub sort_order: SortOrder,
    pub operator: Operator,
    pub reset_schedule: String,
    pub authoritative: bool,
    pub join_required: bool,
    pub max_size: u32,
    pub max_num_score: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Duration,
    pub state: TournamentState,
    /// Set until the backend has acknowledged the create.
    pub sync_pending: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tournament {
    pub fn new(draft: TournamentDraft, now: DateTime<Utc>) -> Result<Self, DomainError> {
        draft.id.validate()?;
        if draft.title.trim().is_empty() {
            return Err(DomainError::Required("title"));
        }
        let category = non_negative(draft.category, "category")?;
        let max_size = non_negative(draft.max_size, "max size")?;
        let max_num_score = non_negative(draft.max_num_score, "max num score")?;
        let start_time = draft.start_time.ok_or(DomainError::Required("start time"))?;
        if draft.duration < Duration::zero() {
            return Err(DomainError::Negative("duration"));
        }
        if let Some(end) = draft.end_time {
            if end < start_time {
                return Err(DomainError::EndBeforeStart);
            }
        }

        Ok(Self {
            id: draft.id,
            title: draft.title,
            description: draft.description,
            category,
            sort_order: draft.sort_order,
            operator: draft.operator,
            reset_schedule: draft.reset_schedule,
            authoritative: draft.authoritative,
            join_required: draft.join_required,
            max_size,
            max_num_score,
            start_time,
            end_time: draft.end_time,
            duration: draft.duration,
            state: TournamentState::Active,
            sync_pending: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Active -> Ended. Ending twice is rejected and keeps the first end time.
    pub fn end(&mut self, end_time: DateTime<Utc>) -> Result<(), DomainError> {
        match self.state {
            TournamentState::Active => {}
            TournamentState::Ended => return Err(DomainError::AlreadyEnded("tournament")),
            TournamentState::Reset => {
                return Err(DomainError::transition(
                    "tournament",
                    self.state,
                    TournamentState::Ended,
                ))
            }
        }
        if end_time < self.start_time {
            return Err(DomainError::EndBeforeStart);
        }
        self.state = TournamentState::Ended;
        self.end_time = Some(end_time);
        self.updated_at = end_time;
        Ok(())
    }

    /// Active or Ended -> Reset.
    pub fn reset(&mut self, reset_time: DateTime<Utc>) -> Result<(), DomainError> {
        if self.state == TournamentState::Reset {
            return Err(DomainError::transition("tournament", self.state, TournamentState::Reset));
        }
        self.state = TournamentState::Reset;
        self.updated_at = reset_time;
        Ok(())
    }

    pub fn mark_synced(&mut self, now: DateTime<Utc>) {
        self.sync_pending = false;
        self.updated_at = now;
    }

    /// True when `other` was created from the same definition. Lifecycle
    /// fields are ignored, as is the end time once `self` has left the
    /// active state.
    pub fn same_definition(&self, other: &Tournament) -> bool {
        let end_matches = !self.is_active() || self.end_time == other.end_time;
        self.id == other.id
            && self.title == other.title
            && self.description == other.description
            && self.category == other.category
            && self.sort_order == other.sort_order
            && self.operator == other.operator
            && self.reset_schedule == other.reset_schedule
            && self.authoritative == other.authoritative
            && self.join_required == other.join_required
            && self.max_size == other.max_size
            && self.max_num_score == other.max_num_score
            && self.start_time == other.start_time
            && self.duration == other.duration
            && end_matches
    }

    pub fn is_active(&self) -> bool {
        self.state == TournamentState::Active
    }

    /// Start plus duration when a duration is set, otherwise the recorded end time.
    pub fn calculate_end_time(&self) -> Option<DateTime<Utc>> {
        if self.duration > Duration::zero() {
            return Some(self.start_time + self.duration);
        }
        self.end_time
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        self.id.validate()?;
        if self.title.trim().is_empty() {
            return Err(DomainError::Required("title"));
        }
        Ok(())
    }
}

impl Aggregate for Tournament {
    type Key = TournamentId;
    const KIND: &'static str = "tournament";

    fn key(&self) -> TournamentId {
        self.id.clone()
    }
}

fn non_negative(value: i64, field: &'static str) -> Result<u32, DomainError> {
    u32::try_from(value).map_err(|_| DomainError::Negative(field))
}
