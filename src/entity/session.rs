use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::UserId;

/// A login session, keyed by the token stored in the `sessionid` cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: Uuid,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: UserId, ttl: Duration) -> Self {
        Self {
            token: Uuid::new_v4(),
            user_id,
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_session_is_live() {
        let session = Session::new(1, Duration::hours(1));
        assert!(!session.is_expired(Utc::now()));
        assert!(session.is_expired(Utc::now() + Duration::hours(2)));
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = Session::new(1, Duration::hours(1));
        let b = Session::new(1, Duration::hours(1));
        assert_ne!(a.token, b.token);
    }
}
