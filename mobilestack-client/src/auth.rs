//! Provider login support.
//!
//! The interactive part of a login (showing the provider's page) belongs to
//! the host application. This module builds the URLs it should open and
//! turns the final redirect into a [`User`].

use crate::error::AuthError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const TOKEN_FRAGMENT: &str = "#token=";
const ERROR_FRAGMENT: &str = "#error=";

/// Identity providers a service can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Microsoft,
    Twitter,
    Facebook,
    Google,
}

impl AuthProvider {
    pub const ALL: [AuthProvider; 4] = [
        AuthProvider::Microsoft,
        AuthProvider::Twitter,
        AuthProvider::Facebook,
        AuthProvider::Google,
    ];

    /// Path segment used by the service's login endpoint.
    pub const fn as_str(self) -> &'static str {
        match self {
            AuthProvider::Microsoft => "microsoft",
            AuthProvider::Twitter => "twitter",
            AuthProvider::Facebook => "facebook",
            AuthProvider::Google => "google",
        }
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuthProvider::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown authentication provider '{s}'"))
    }
}

/// A user signed in through one of the providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Service-wide user id, stable across devices and sessions.
    pub user_id: String,
    /// Token authorizing requests made on this user's behalf.
    pub authentication_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginPayload {
    user: LoginUser,
    authentication_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginUser {
    user_id: String,
}

impl User {
    pub fn new(user_id: impl Into<String>, authentication_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            authentication_token: authentication_token.into(),
        }
    }

    /// Parses the service's login result:
    /// `{"user":{"userId":..},"authenticationToken":..}`.
    pub fn from_login_json(json: &str) -> Result<Self, AuthError> {
        let payload: LoginPayload = serde_json::from_str(json)?;
        Ok(Self {
            user_id: payload.user.user_id,
            authentication_token: payload.authentication_token,
        })
    }
}

/// Interprets the redirect the login flow ends on.
///
/// `...#token=<url-encoded JSON>` yields the user; `...#error=<url-encoded
/// text>` yields [`AuthError::Rejected`].
pub fn parse_login_redirect(url: &str) -> Result<User, AuthError> {
    if let Some(index) = url.find(TOKEN_FRAGMENT) {
        let json = decode_fragment(&url[index + TOKEN_FRAGMENT.len()..])?;
        return User::from_login_json(&json);
    }
    if let Some(index) = url.find(ERROR_FRAGMENT) {
        let reason = decode_fragment(&url[index + ERROR_FRAGMENT.len()..])?;
        return Err(AuthError::Rejected(reason));
    }
    Err(AuthError::Incomplete)
}

fn decode_fragment(fragment: &str) -> Result<String, AuthError> {
    urlencoding::decode(fragment)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| AuthError::MalformedRedirect(e.to_string()))
}
