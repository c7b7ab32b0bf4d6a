//! Credential loading and JWT token acquisition.

use crate::{CipApiError, CipApiResult};
use std::path::{Path, PathBuf};

/// Username and password for the token endpoint.
///
/// Each value is kept in its own file so the files can carry tighter permissions than the
/// rest of the configuration.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read the first line of each credential file.
    pub fn from_files(username_file: &Path, password_file: &Path) -> CipApiResult<Self> {
        Ok(Self {
            username: read_first_line(username_file)?,
            password: read_first_line(password_file)?,
        })
    }
}

fn read_first_line(path: &Path) -> CipApiResult<String> {
    let contents = std::fs::read_to_string(path).map_err(|source| CipApiError::Credentials {
        path: PathBuf::from(path),
        source,
    })?;
    let line = contents.lines().next().unwrap_or("").trim_end();
    if line.is_empty() {
        return Err(CipApiError::InvalidConfiguration(format!(
            "credential file is empty: {}",
            path.display()
        )));
    }
    Ok(line.to_string())
}

/// A bearer token issued by the `get-token` endpoint.
#[derive(Clone)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Value for the `Authorization` header. The API expects the `JWT` scheme.
    pub fn authorization_header(&self) -> String {
        format!("JWT {}", self.0)
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiToken(<redacted>)")
    }
}

#[derive(serde::Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) token: Option<String>,
}
