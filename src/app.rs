//! Application state for dimedia-tui.
//!
//! The `App` struct owns the session, the API client, the stopwatch, and
//! the currently displayed image, and coordinates the one background task
//! this application runs: the image download.

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, ApiError, LoginResult};
use crate::auth::{Credentials, Session};
use crate::config::Config;
use crate::texture::{DeviceCaps, FitOutcome, Fitted, TextureFitter};
use crate::timer::Stopwatch;
use crate::utils::{format_bytes, truncate_string};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the download result channel. One download runs at a
/// time; the extra slots absorb results from superseded downloads.
const CHANNEL_BUFFER_SIZE: usize = 4;

/// Maximum length for username input.
const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum length for password input.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum length for the login error line (the overlay is narrow).
const MAX_LOGIN_ERROR_LENGTH: usize = 40;

// ============================================================================
// UI state enums
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    LoggingIn,
    ShowingHelp,
    ConfirmingQuit,
}

/// The two main panels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Image,
    Stopwatch,
}

impl Panel {
    pub fn other(self) -> Self {
        match self {
            Panel::Image => Panel::Stopwatch,
            Panel::Stopwatch => Panel::Image,
        }
    }
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Username,
    Password,
    Button,
}

/// Result of a background image download, delivered over the channel.
enum DownloadResult {
    Bytes(Vec<u8>),
    Failed(ApiError),
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    pub session: Session,
    pub api: ApiClient,
    pub fitter: TextureFitter,

    // UI state
    pub state: AppState,
    pub panel: Panel,

    // Login form state
    pub login_username: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,
    pub last_login: Option<LoginResult>,

    // Stopwatch
    pub stopwatch: Stopwatch,

    /// Currently displayed image. Replaced wholesale by each successful
    /// download; the previous one is dropped with the assignment.
    pub image: Option<Fitted>,
    pub last_download_size: Option<usize>,

    // Background download channel
    download_rx: mpsc::Receiver<DownloadResult>,
    download_tx: mpsc::Sender<DownloadResult>,
    /// In-flight download slot. A new trigger overwrites it, so
    /// overlapping downloads are possible and the last completion wins;
    /// nothing cancels the superseded task.
    download_task: Option<JoinHandle<()>>,

    // Status message
    pub status_message: Option<String>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let api = ApiClient::new(&config)?;
        let fitter = TextureFitter::new(DeviceCaps::detect(), config.max_texture_dim);
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        // Prefill the form from the environment when provided
        let login_username = std::env::var("DIMEDIA_USERNAME").unwrap_or_default();
        let login_password = std::env::var("DIMEDIA_PASSWORD").unwrap_or_default();

        Ok(Self {
            config,
            session: Session::new(),
            api,
            fitter,

            state: AppState::Normal,
            panel: Panel::Image,

            login_username,
            login_password,
            login_focus: LoginFocus::Username,
            login_error: None,
            last_login: None,

            stopwatch: Stopwatch::new(),

            image: None,
            last_download_size: None,

            download_rx: rx,
            download_tx: tx,
            download_task: None,

            status_message: None,
        })
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Show the login overlay.
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_focus = if self.login_username.is_empty() {
            LoginFocus::Username
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    /// Submit the login form.
    ///
    /// Awaited inline from the key handler, so the UI blocks for the
    /// duration of the call (bounded by the client timeouts).
    pub async fn submit_login(&mut self) {
        if self.login_username.is_empty() || self.login_password.is_empty() {
            self.login_error = Some("Username and password required".to_string());
            return;
        }
        self.login_error = None;

        let credentials = Credentials::new(&self.login_username, &self.login_password);
        let result = self.api.login(&credentials).await;
        self.apply_login_result(result);
    }

    /// Fold a login result into app state.
    ///
    /// Any discovered token becomes the session token - even from a
    /// failed login whose error body carried one, matching the upstream
    /// API's observed behavior.
    pub fn apply_login_result(&mut self, result: LoginResult) {
        debug!(
            status = ?result.status_code,
            body_len = result.raw_body.len(),
            "applying login result"
        );

        if let Some(ref token) = result.token {
            self.session.establish(token.clone(), &self.login_username);
        }

        if result.success {
            info!(status = ?result.status_code, "login succeeded");
            self.login_password.clear();
            self.state = AppState::Normal;
            self.status_message = Some(if result.token.is_some() {
                "Logged in".to_string()
            } else {
                "Logged in (no token in response)".to_string()
            });
        } else {
            let message = result
                .error
                .clone()
                .unwrap_or_else(|| "Login failed".to_string());
            error!(
                error = %message,
                token_salvaged = result.token.is_some(),
                "login failed"
            );
            self.login_error = Some(truncate_string(&message, MAX_LOGIN_ERROR_LENGTH));
        }

        self.last_login = Some(result);
    }

    /// Drop the session and reopen the login overlay.
    pub fn logout(&mut self) {
        self.session.clear();
        self.start_login();
    }

    // =========================================================================
    // Image download
    // =========================================================================

    /// Spawn the image download onto the runtime.
    ///
    /// The task gets a snapshot of the session; the result arrives via
    /// the channel and is folded in by [`App::poll_downloads`].
    pub fn start_download(&mut self) {
        let api = self.api.clone();
        let session = self.session.clone();
        let tx = self.download_tx.clone();

        let task = tokio::spawn(async move {
            let result = match api.fetch_image(&session).await {
                Ok(bytes) => DownloadResult::Bytes(bytes),
                Err(e) => DownloadResult::Failed(e),
            };
            if let Err(e) = tx.send(result).await {
                error!(error = %e, "failed to deliver download result - channel closed");
            }
        });

        if self.download_in_flight() {
            warn!("download triggered while one is in flight; handle overwritten");
        }
        self.download_task = Some(task);
        self.status_message = Some("Downloading image...".to_string());
    }

    pub fn download_in_flight(&self) -> bool {
        self.download_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Drain completed download results from the channel.
    pub fn poll_downloads(&mut self) {
        let mut results = Vec::new();
        while let Ok(result) = self.download_rx.try_recv() {
            results.push(result);
        }
        for result in results {
            self.process_download_result(result);
        }
    }

    fn process_download_result(&mut self, result: DownloadResult) {
        match result {
            DownloadResult::Bytes(bytes) => {
                let size = bytes.len();
                match self.fitter.fit(&bytes) {
                    Ok(fitted) => {
                        let (width, height) = fitted.dimensions();
                        info!(size, width, height, outcome = ?fitted.outcome, "image ready");
                        self.status_message = Some(format!(
                            "{} downloaded, showing {}x{}{}",
                            format_bytes(size),
                            width,
                            height,
                            match fitted.outcome {
                                FitOutcome::Scaled { .. } => " (scaled down)",
                                FitOutcome::GaveUp => " (oversized)",
                                FitOutcome::Unchanged => "",
                            }
                        ));
                        self.last_download_size = Some(size);
                        // Replaces (drops) the previously displayed image
                        self.image = Some(fitted);
                    }
                    Err(e) => {
                        // Display stays as it was
                        error!(error = %e, "image pipeline failed");
                        self.status_message = Some(format!("Image failed: {}", e));
                    }
                }
            }
            DownloadResult::Failed(e) => {
                error!(error = %e, "image download failed");
                self.status_message = Some(format!(
                    "Download failed: {}",
                    truncate_string(&e.to_string(), 60)
                ));
            }
        }
    }

    // =========================================================================
    // Frame tick
    // =========================================================================

    /// Frame tick from the main loop. `delta` is seconds since the last
    /// frame.
    pub fn tick(&mut self, delta: f32) {
        self.stopwatch.tick(delta);
    }
}

// ============================================================================
// Input validation helpers
// ============================================================================

pub fn can_add_username_char(current_len: usize, c: char) -> bool {
    current_len < MAX_USERNAME_LENGTH && !c.is_control()
}

pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && !c.is_control()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> App {
        let mut app = App::new(Config::default()).unwrap();
        // Tests must not depend on ambient DIMEDIA_* variables
        app.login_username = "viewer@example.org".to_string();
        app.login_password = "hunter2".to_string();
        app
    }

    fn login_result(success: bool, token: Option<&str>) -> LoginResult {
        LoginResult {
            success,
            status_code: Some(if success { 200 } else { 401 }),
            raw_body: String::new(),
            error: if success {
                None
            } else {
                Some("HTTP 401 Unauthorized".to_string())
            },
            token: token.map(str::to_string),
        }
    }

    #[test]
    fn test_can_add_username_char() {
        assert!(can_add_username_char(0, 'a'));
        assert!(can_add_username_char(49, 'z'));
        assert!(!can_add_username_char(50, 'a'));
        assert!(!can_add_username_char(0, '\x00'));
        assert!(!can_add_username_char(0, '\n'));
    }

    #[test]
    fn test_can_add_password_char() {
        assert!(can_add_password_char(0, 'a'));
        assert!(can_add_password_char(127, '!'));
        assert!(!can_add_password_char(128, 'a'));
        assert!(!can_add_password_char(0, '\r'));
    }

    #[test]
    fn test_panel_other() {
        assert_eq!(Panel::Image.other(), Panel::Stopwatch);
        assert_eq!(Panel::Stopwatch.other(), Panel::Image);
    }

    #[test]
    fn test_successful_login_establishes_session() {
        let mut app = test_app();
        app.start_login();

        app.apply_login_result(login_result(true, Some("tok-123")));

        assert_eq!(app.session.token(), Some("tok-123"));
        assert_eq!(app.state, AppState::Normal);
        assert!(app.login_password.is_empty());
        assert!(app.login_error.is_none());
    }

    #[test]
    fn test_failed_login_with_token_still_establishes_session() {
        let mut app = test_app();
        app.start_login();

        app.apply_login_result(login_result(false, Some("salvaged")));

        // The odd upstream behavior: a rejected login whose body carried
        // a token still leaves a usable session behind
        assert_eq!(app.session.token(), Some("salvaged"));
        assert_eq!(app.state, AppState::LoggingIn);
        assert!(app.login_error.is_some());
    }

    #[test]
    fn test_failed_login_without_token_leaves_session_empty() {
        let mut app = test_app();
        app.start_login();

        app.apply_login_result(login_result(false, None));

        assert_eq!(app.session.token(), None);
        assert_eq!(app.state, AppState::LoggingIn);
    }

    #[test]
    fn test_logout_clears_session_and_reopens_login() {
        let mut app = test_app();
        app.apply_login_result(login_result(true, Some("tok")));

        app.logout();

        assert_eq!(app.session.token(), None);
        assert_eq!(app.state, AppState::LoggingIn);
    }

    #[tokio::test]
    async fn test_empty_credentials_rejected_before_any_request() {
        let mut app = test_app();
        app.login_username.clear();
        app.start_login();

        app.submit_login().await;

        assert!(app.login_error.is_some());
        assert!(app.last_login.is_none());
    }
}
