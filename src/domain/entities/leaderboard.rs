//! Leaderboard score submissions and seasons

use chrono::{DateTime, Utc};

use crate::domain::errors::DomainError;
use crate::domain::shared::{IdempotencyKey, PlayerId, SeasonId};
use crate::domain::traits::Aggregate;

/// A single score write; deduplicated downstream by its idempotency key
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSubmission {
    pub player_id: PlayerId,
    pub season_id: SeasonId,
    pub value: i64,
    pub idempotency_key: IdempotencyKey,
    pub submitted_at: DateTime<Utc>,
}

impl ScoreSubmission {
    pub fn validate(&self) -> Result<(), DomainError> {
        self.player_id.validate()?;
        self.season_id.validate()?;
        self.idempotency_key.validate()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Season {
    pub id: SeasonId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub active: bool,
}

impl Season {
    pub fn new(
        id: SeasonId,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        id.validate()?;
        if ends_at < starts_at {
            return Err(DomainError::EndBeforeStart);
        }
        Ok(Self {
            id,
            starts_at,
            ends_at,
            active: false,
        })
    }

    /// Recomputes the active flag: true strictly inside the season window.
    pub fn activate(&mut self, now: DateTime<Utc>) {
        self.active = now > self.starts_at && now < self.ends_at;
    }
}

impl Aggregate for Season {
    type Key = SeasonId;
    const KIND: &'static str = "season";

    fn key(&self) -> SeasonId {
        self.id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn submission_requires_identifiers() {
        let ok = ScoreSubmission {
            player_id: "p1".into(),
            season_id: "s1".into(),
            value: 100,
            idempotency_key: "k1".into(),
            submitted_at: Utc::now(),
        };
        assert!(ok.validate().is_ok());

        let mut missing_key = ok.clone();
        missing_key.idempotency_key = "".into();
        assert!(missing_key.validate().is_err());

        let mut missing_season = ok;
        missing_season.season_id = " ".into();
        assert!(missing_season.validate().is_err());
    }

    #[test]
    fn activate_tracks_window() {
        let start = Utc::now();
        let mut season = Season::new("s1".into(), start, start + Duration::days(30)).unwrap();

        season.activate(start);
        assert!(!season.active);
        season.activate(start + Duration::days(1));
        assert!(season.active);
        season.activate(start + Duration::days(31));
        assert!(!season.active);
    }

    #[test]
    fn season_window_must_be_ordered() {
        let start = Utc::now();
        assert_eq!(
            Season::new("s1".into(), start, start - Duration::days(1)).unwrap_err(),
            DomainError::EndBeforeStart
        );
    }
}
