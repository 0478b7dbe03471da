use chrono::{DateTime, Utc};

/// An established login.
#[derive(Debug, Clone)]
pub struct SessionData {
    pub token: String,
    pub username: String,
    pub established_at: DateTime<Utc>,
}

/// The single bearer-token slot for the process.
///
/// Owned by the application and handed by reference to anything that makes
/// authenticated requests. Set whenever a login attempt surfaces a token
/// (including failed attempts whose error body carried a token-shaped
/// field), cleared on logout. Nothing is persisted; the session dies with
/// the process.
#[derive(Debug, Clone, Default)]
pub struct Session {
    data: Option<SessionData>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a token, overwriting whatever was there.
    pub fn establish(&mut self, token: String, username: &str) {
        self.data = Some(SessionData {
            token,
            username: username.to_string(),
            established_at: Utc::now(),
        });
    }

    /// Drop the current login, if any.
    pub fn clear(&mut self) {
        self.data = None;
    }

    /// The bearer token, when logged in.
    pub fn token(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.token.as_str())
    }

    pub fn username(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.username.as_str())
    }

    pub fn established_at(&self) -> Option<DateTime<Utc>> {
        self.data.as_ref().map(|d| d.established_at)
    }
}
