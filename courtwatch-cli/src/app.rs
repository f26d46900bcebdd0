use std::sync::Arc;

use anyhow::{Result, bail};
use reqwest::Client;
use tracing::info;

use courtwatch_core::{
    driver::DriverPorts,
    model::AccessToken,
    notify::LogSink,
    ports::{Authenticator, NotificationSink, SnapshotStore},
    store::{FileSnapshotStore, MemorySnapshotStore},
};
use courtwatch_discord::DiscordWebhookSink;
use courtwatch_provider_mindbody::{
    CommandAuthenticator, MindbodyAvailability, StaticAuthenticator, Venue,
};

use crate::args::Args;

/// Credentials and channel settings read from the environment (or `.env`).
#[derive(Default)]
pub(crate) struct Secrets {
    pub discord_webhook_url: Option<String>,
    pub access_token: Option<String>,
    pub login_command: Option<String>,
}

impl Secrets {
    pub(crate) fn from_env() -> Self {
        Self {
            discord_webhook_url: non_empty_var("DISCORD_WEBHOOK_URL"),
            access_token: non_empty_var("MINDBODY_ACCESS_TOKEN"),
            login_command: non_empty_var("MINDBODY_LOGIN_COMMAND"),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    dotenvy::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Wire the collaborators selected by `args` and `secrets`.
pub(crate) fn build_ports(args: &Args, secrets: &Secrets, client: Client) -> Result<DriverPorts> {
    let authenticator: Arc<dyn Authenticator> = match (&secrets.login_command, &secrets.access_token) {
        (Some(command), _) => Arc::new(CommandAuthenticator::from_command_line(command)?),
        (None, Some(token)) => Arc::new(StaticAuthenticator::new(AccessToken::new(token.as_str()))),
        (None, None) => bail!("set MINDBODY_LOGIN_COMMAND or MINDBODY_ACCESS_TOKEN"),
    };

    let sink: Arc<dyn NotificationSink> = if args.no_discord {
        info!("Discord disabled, announcements are only logged");
        Arc::new(LogSink)
    } else {
        let Some(url) = &secrets.discord_webhook_url else {
            bail!("set DISCORD_WEBHOOK_URL or pass --no-discord");
        };
        Arc::new(DiscordWebhookSink::new(url.as_str())?)
    };

    let store: Arc<dyn SnapshotStore> = match &args.state_file {
        Some(path) => {
            info!(path = %path.display(), "Persisting snapshots");
            Arc::new(FileSnapshotStore::new(path.clone()))
        }
        None => Arc::new(MemorySnapshotStore::new()),
    };

    Ok(DriverPorts {
        authenticator,
        availability: Arc::new(MindbodyAvailability::new(client, Venue::default())),
        store,
        sink,
    })
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn args(extra: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("courtwatch").chain(extra.iter().copied()))
            .expect("valid args")
    }

    #[test]
    fn requires_some_credential() {
        let secrets = Secrets::default();
        assert!(build_ports(&args(&["--no-discord"]), &secrets, Client::new()).is_err());
    }

    #[test]
    fn requires_a_webhook_unless_discord_is_disabled() {
        let secrets = Secrets {
            access_token: Some("token".to_owned()),
            ..Secrets::default()
        };
        assert!(build_ports(&args(&[]), &secrets, Client::new()).is_err());
        assert!(build_ports(&args(&["--no-discord"]), &secrets, Client::new()).is_ok());
    }

    #[test]
    fn wires_discord_and_login_helper() {
        let secrets = Secrets {
            discord_webhook_url: Some("https://discord.com/api/webhooks/1/abc".to_owned()),
            login_command: Some("node login.js --headless".to_owned()),
            ..Secrets::default()
        };
        assert!(build_ports(&args(&["--state-file", "state.json"]), &secrets, Client::new()).is_ok());
    }
}
