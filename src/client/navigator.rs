//! Navigation capability supplied by the hosting application

use tracing::warn;

/// Invoked when the session can no longer be recovered.
///
/// Any `Fn()` closure works as a navigator.
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self);
}

impl<F> Navigator for F
where
    F: Fn() + Send + Sync,
{
    fn redirect_to_login(&self) {
        self()
    }
}

/// Navigator for headless hosts: records the redirect in the log.
#[derive(Debug, Clone)]
pub struct LoggingNavigator {
    login_path: String,
}

impl LoggingNavigator {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }
}

impl Default for LoggingNavigator {
    fn default() -> Self {
        Self::new("/login")
    }
}

impl Navigator for LoggingNavigator {
    fn redirect_to_login(&self) {
        warn!(login_path = %self.login_path, "Session expired, redirecting to login");
    }
}
