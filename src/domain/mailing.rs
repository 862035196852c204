use crate::domain::access::Owned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Position of "now" relative to a mailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPhase {
    Created,
    Running,
    Finished,
}

/// Persisted mailing status.
///
/// `DisabledByAdmin` is sticky: once set, time-based derivation no longer applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailingStatus {
    Scheduled(WindowPhase),
    DisabledByAdmin,
}

impl MailingStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled(WindowPhase::Created) => "created",
            Self::Scheduled(WindowPhase::Running) => "running",
            Self::Scheduled(WindowPhase::Finished) => "finished",
            Self::DisabledByAdmin => "disabled_by_admin",
        }
    }

    #[must_use]
    pub const fn is_disabled(self) -> bool {
        matches!(self, Self::DisabledByAdmin)
    }
}

impl From<WindowPhase> for MailingStatus {
    fn from(phase: WindowPhase) -> Self {
        Self::Scheduled(phase)
    }
}

impl fmt::Display for MailingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MailingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Scheduled(WindowPhase::Created)),
            "running" => Ok(Self::Scheduled(WindowPhase::Running)),
            "finished" => Ok(Self::Scheduled(WindowPhase::Finished)),
            "disabled_by_admin" => Ok(Self::DisabledByAdmin),
            other => Err(format!("Unknown mailing status: {other}")),
        }
    }
}

impl Serialize for MailingStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("Start must be before end")]
    StartNotBeforeEnd,
    #[error("Start cannot be in the past")]
    StartInPast,
}

/// The `[start, end]` interval during which a mailing may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: OffsetDateTime,
    end: OffsetDateTime,
}

impl Window {
    /// Validates a window submitted at `now`.
    ///
    /// # Errors
    /// Returns `WindowError::StartInPast` if `start < now`, or
    /// `WindowError::StartNotBeforeEnd` if `start >= end`.
    pub fn new(start: OffsetDateTime, end: OffsetDateTime, now: OffsetDateTime) -> Result<Self, WindowError> {
        if start < now {
            return Err(WindowError::StartInPast);
        }
        if start >= end {
            return Err(WindowError::StartNotBeforeEnd);
        }
        Ok(Self { start, end })
    }

    /// Builds a window from stored values without validation.
    #[must_use]
    pub(crate) const fn from_stored(start: OffsetDateTime, end: OffsetDateTime) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn start(&self) -> OffsetDateTime {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> OffsetDateTime {
        self.end
    }

    #[must_use]
    pub fn phase_at(&self, now: OffsetDateTime) -> WindowPhase {
        if now < self.start {
            WindowPhase::Created
        } else if now <= self.end {
            WindowPhase::Running
        } else {
            WindowPhase::Finished
        }
    }

    #[must_use]
    pub fn contains(&self, now: OffsetDateTime) -> bool {
        self.start <= now && now <= self.end
    }
}

#[derive(Debug, Clone)]
pub struct Mailing {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub message_id: Uuid,
    pub window: Window,
    pub status: MailingStatus,
    pub recipient_ids: Vec<Uuid>,
    pub created_at: Option<OffsetDateTime>,
}

impl Owned for Mailing {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl Mailing {
    /// The status this mailing should have at `now`, or `None` if the stored one is current.
    #[must_use]
    pub fn pending_status(&self, now: OffsetDateTime) -> Option<MailingStatus> {
        if self.status.is_disabled() {
            return None;
        }
        let derived = MailingStatus::from(self.window.phase_at(now));
        (derived != self.status).then_some(derived)
    }
}

/// Outcome of one send operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SendReport {
    pub sent: u32,
    pub failed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn window_around(now: OffsetDateTime) -> Window {
        Window::from_stored(now - Duration::hours(1), now + Duration::hours(1))
    }

    fn mailing(window: Window, status: MailingStatus) -> Mailing {
        Mailing {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
            window,
            status,
            recipient_ids: Vec::new(),
            created_at: None,
        }
    }

    #[test]
    fn test_phase_boundaries() {
        let now = OffsetDateTime::now_utc();
        let window = window_around(now);

        assert_eq!(window.phase_at(window.start() - Duration::seconds(1)), WindowPhase::Created);
        assert_eq!(window.phase_at(window.start()), WindowPhase::Running);
        assert_eq!(window.phase_at(now), WindowPhase::Running);
        assert_eq!(window.phase_at(window.end()), WindowPhase::Running);
        assert_eq!(window.phase_at(window.end() + Duration::seconds(1)), WindowPhase::Finished);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let now = OffsetDateTime::now_utc();
        let window = window_around(now);
        assert!(window.contains(window.start()));
        assert!(window.contains(window.end()));
        assert!(!window.contains(window.end() + Duration::milliseconds(1)));
    }

    #[test]
    fn test_window_validation() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(
            Window::new(now - Duration::minutes(1), now + Duration::hours(1), now),
            Err(WindowError::StartInPast)
        );
        assert_eq!(
            Window::new(now + Duration::hours(2), now + Duration::hours(1), now),
            Err(WindowError::StartNotBeforeEnd)
        );
        assert_eq!(
            Window::new(now + Duration::hours(1), now + Duration::hours(1), now),
            Err(WindowError::StartNotBeforeEnd)
        );
        assert!(Window::new(now, now + Duration::hours(1), now).is_ok());
    }

    #[test]
    fn test_pending_status_promotes_created_to_running() {
        let now = OffsetDateTime::now_utc();
        let m = mailing(window_around(now), WindowPhase::Created.into());
        assert_eq!(m.pending_status(now), Some(MailingStatus::Scheduled(WindowPhase::Running)));
    }

    #[test]
    fn test_pending_status_is_none_when_current() {
        let now = OffsetDateTime::now_utc();
        let m = mailing(window_around(now), WindowPhase::Running.into());
        assert_eq!(m.pending_status(now), None);
    }

    #[test]
    fn test_disabled_is_sticky() {
        let now = OffsetDateTime::now_utc();
        let past = Window::from_stored(now - Duration::hours(2), now - Duration::hours(1));
        let m = mailing(past, MailingStatus::DisabledByAdmin);

        for offset in [-3, 0, 3] {
            assert_eq!(m.pending_status(now + Duration::hours(offset)), None);
        }
        assert!(!m.window.contains(now));
    }

    #[test]
    fn test_status_text_roundtrip() {
        for status in [
            MailingStatus::Scheduled(WindowPhase::Created),
            MailingStatus::Scheduled(WindowPhase::Running),
            MailingStatus::Scheduled(WindowPhase::Finished),
            MailingStatus::DisabledByAdmin,
        ] {
            assert_eq!(status.as_str().parse::<MailingStatus>().unwrap(), status);
        }
        assert!("paused".parse::<MailingStatus>().is_err());
    }
}
