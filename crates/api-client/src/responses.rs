use core_types::{AuthUser, Session};
use serde::{Deserialize, Serialize};

/// Body of the password grant and of sign-up.
#[derive(Debug, Serialize)]
pub(crate) struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshPayload<'a> {
    pub refresh_token: &'a str,
}

/// Sign-up answers with a full session when e-mail confirmation is disabled,
/// and with the bare user when a confirmation mail was sent.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SignUpResponse {
    Session(Session),
    User(AuthUser),
}

/// The auth API is not consistent about its error body; every known variant is
/// accepted and the most descriptive field wins.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorResponse {
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub msg: Option<String>,
    pub message: Option<String>,
}

impl ApiErrorResponse {
    pub fn into_message(self, fallback: &str) -> String {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .unwrap_or_else(|| fallback.to_string())
    }
}
