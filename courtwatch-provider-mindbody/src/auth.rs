//! Access token sources for the Mindbody gateway.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use courtwatch_core::{
    model::AccessToken,
    ports::{Authenticator, PortError},
};

const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(120);

/// Hands out a token supplied at startup.
pub struct StaticAuthenticator {
    token: AccessToken,
}

impl StaticAuthenticator {
    /// Wrap a token obtained out of band.
    #[must_use]
    pub fn new(token: AccessToken) -> Self {
        Self { token }
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn access_token(&self) -> Result<AccessToken, PortError> {
        Ok(self.token.clone())
    }
}

/// The `USER-SESSION` cookie payload some login helpers print verbatim.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserSession {
    access_token: String,
}

/// Obtains tokens by running an external login helper, such as a headless browser script.
///
/// The helper must print the token, or the session JSON carrying an `accessToken`
/// field, on stdout and exit successfully. Each login runs in its own process, which
/// is killed if it outlives the timeout or the request is dropped.
pub struct CommandAuthenticator {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandAuthenticator {
    /// Run `program` with `args` for every login.
    #[must_use]
    pub fn new<P, I, A>(program: P, args: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_LOGIN_TIMEOUT,
        }
    }

    /// Parse a shell-like command line, splitting on whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Authentication`] for an empty command line.
    pub fn from_command_line(command_line: &str) -> Result<Self, PortError> {
        let mut words = command_line.split_whitespace();
        let program = words
            .next()
            .ok_or_else(|| PortError::Authentication("empty login command".to_owned()))?;
        Ok(Self::new(program, words))
    }

    /// Give up on a login after `limit`.
    #[must_use]
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = limit;
        self
    }
}

#[async_trait]
impl Authenticator for CommandAuthenticator {
    async fn access_token(&self) -> Result<AccessToken, PortError> {
        info!(program = %self.program, "Running login helper");

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_elapsed| {
                PortError::Authentication(format!(
                    "login helper timed out after {}s",
                    self.timeout.as_secs()
                ))
            })??;

        if !output.status.success() {
            return Err(PortError::Authentication(format!(
                "login helper exited with {}",
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let token = parse_token(&stdout)?;
        debug!("Login helper returned a token");
        Ok(token)
    }
}

// Helpers may print the cookie value still percent-encoded (`%7B%22accessToken...`).
fn parse_token(stdout: &str) -> Result<AccessToken, PortError> {
    let decoded = urlencoding::decode(stdout.trim()).map_err(|err| {
        PortError::Authentication(format!("login helper printed invalid UTF-8 escapes: {err}"))
    })?;
    let trimmed = decoded.trim();
    let raw = if trimmed.starts_with('{') {
        serde_json::from_str::<UserSession>(trimmed)?.access_token
    } else {
        trimmed.to_owned()
    };

    if raw.is_empty() {
        return Err(PortError::Authentication(
            "login helper printed no token".to_owned(),
        ));
    }
    Ok(AccessToken::new(raw))
}
