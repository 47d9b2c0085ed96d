use crate::transport::HttpRequest;
use std::sync::{PoisonError, RwLock};

/// Header carrying the static application key.
pub const APPLICATION_KEY_HEADER: &str = "X-ZUMO-APPLICATION";

/// Header carrying the signed-in user's token.
pub const AUTH_HEADER: &str = "X-ZUMO-AUTH";

/// Attaches application identity and, when a user is signed in, the user
/// token to every outbound request.
#[derive(Debug)]
pub struct RequestDecorator {
    application_key: String,
    auth_token: RwLock<Option<String>>,
}

impl RequestDecorator {
    pub fn new(application_key: impl Into<String>) -> Self {
        Self {
            application_key: application_key.into(),
            auth_token: RwLock::new(None),
        }
    }

    pub fn auth_token(&self) -> Option<String> {
        self.auth_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_auth_token(&self, token: impl Into<String>) {
        *self.auth_token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    pub fn clear_auth_token(&self) {
        *self.auth_token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn decorate(&self, request: HttpRequest) -> HttpRequest {
        let request = request.header(APPLICATION_KEY_HEADER, self.application_key.as_str());
        match self.auth_token() {
            Some(token) => request.header(AUTH_HEADER, token),
            None => request,
        }
    }
}
