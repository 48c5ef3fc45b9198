use thiserror::Error;

use crate::config::Mode;

#[derive(Debug, Error)]
pub enum ArmError {
    #[error("this command requires arm mode (current mode: {0}) — run `armctl config mode arm`")]
    WrongMode(Mode),

    #[error("no subscriptions found — run `armctl account login` first")]
    NoSubscription,

    #[error("subscription not found: {0}")]
    SubscriptionNotFound(String),

    #[error("no default subscription — use `armctl account set <id>` or `--subscription <id>`")]
    NoDefaultSubscription,

    #[error("subscription {0} has no access token — run `armctl account login`")]
    NotLoggedIn(String),

    #[error("access token for subscription {0} has expired — run `armctl account login` again")]
    TokenExpired(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid --properties JSON: {0}")]
    InvalidProperties(String),

    #[error("invalid resource type '{0}': expected <Namespace>/<type>, e.g. Microsoft.Web/sites")]
    InvalidResourceType(String),

    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("environment not found: {0}")]
    EnvironmentNotFound(String),
}

impl ArmError {
    /// Build an API error from a response body, preferring the ARM
    /// `{"error": {"code", "message"}}` envelope when present.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                let err = v.get("error")?;
                let code = err.get("code").and_then(|c| c.as_str()).unwrap_or("Error");
                let msg = err.get("message").and_then(|m| m.as_str())?;
                Some(format!("{}: {}", code, msg))
            })
            .unwrap_or_else(|| body.to_string());
        ArmError::ApiError { status, message }
    }
}
