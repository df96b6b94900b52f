use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Idle,
    Active,
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Idle
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub status: SessionStatus,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    /// Captures whose upload completed (accepted or rejected) this session.
    pub frames_sent: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            session_id: None,
            started_at: None,
            frames_sent: 0,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn begin(&mut self, session_id: String, started_at: DateTime<Utc>) {
        *self = Self {
            status: SessionStatus::Active,
            session_id: Some(session_id),
            started_at: Some(started_at),
            frames_sent: 0,
        };
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_and_reset_round_trip() {
        let mut state = SessionState::new();
        assert!(!state.is_active());

        state.begin("abc".into(), Utc::now());
        assert!(state.is_active());
        assert_eq!(state.session_id.as_deref(), Some("abc"));

        state.frames_sent = 3;
        state.reset();
        assert!(!state.is_active());
        assert_eq!(state.frames_sent, 0);
        assert!(state.session_id.is_none());
    }
}
