//! Command dispatch. Every command prints pretty JSON on stdout.

use anyhow::{Context, Result};
use chrono::Utc;
use flexgo_core::auth::SessionToken;
use flexgo_core::{AuthState, Config, CredentialStore, FileTokenStore, FlexitGo, TokenStore};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::cli::{Cli, Command, GlobalOpts, Switch};
use crate::credentials;

pub async fn run(cli: Cli) -> Result<()> {
    let Cli { global, command } = cli;
    let mut config = load_config(&global)?;

    match command {
        Command::Status => status(&global, &config),
        Command::Forget => forget(&global, &config),
        command => {
            if config.subscription_key.is_none() {
                warn!("No subscription key configured; the API gateway will likely refuse requests");
            }
            let resolved = credentials::resolve(&global, &config)?;
            let flexit = FlexitGo::new(&config, resolved.credentials.clone())?;
            flexit.login().await.context("Login failed")?;
            let password_accepted = flexit.session().password_accepted().await;
            resolved.remember(&global, &mut config, password_accepted);
            execute(&flexit, command).await
        }
    }
}

async fn execute(flexit: &FlexitGo, command: Command) -> Result<()> {
    match command {
        Command::Login => {
            let session = flexit.session();
            print_json(&json!({
                "username": session.username(),
                "state": session.state().await,
                "plant_id": session.plant_id().await?,
                "expires_at": session.token_expires_at().await,
            }))
        }
        Command::Plants => print_json(&flexit.plants().await?),
        Command::Sensors => print_json(&flexit.sensors().await?),
        Command::Device => print_json(&flexit.device_info().await?),
        Command::SetMode(args) => {
            let change = flexit.set_preset_mode(args.mode).await?;
            info!(mode = %args.mode, "Mode request handled");
            print_json(&change)
        }
        Command::SetHomeTemp { celsius } => {
            flexit.set_home_temperature(celsius).await?;
            print_ok()
        }
        Command::SetAwayTemp { celsius } => {
            flexit.set_away_temperature(celsius).await?;
            print_ok()
        }
        Command::SetFireplaceDuration { minutes } => {
            flexit.set_fireplace_duration(minutes).await?;
            print_ok()
        }
        Command::SetBoostDuration { minutes } => {
            flexit.set_boost_duration(minutes).await?;
            print_ok()
        }
        Command::SetAwayDelay { minutes } => {
            flexit.set_away_delay(minutes).await?;
            print_ok()
        }
        Command::Heater { state } => {
            flexit.set_heater(matches!(state, Switch::On)).await?;
            print_ok()
        }
        Command::CalendarActive => {
            flexit.set_calendar_active().await?;
            print_ok()
        }
        Command::CalendarOverride { value } => {
            flexit.set_calendar_temporary_override(&value).await?;
            print_ok()
        }
        // Handled before logging in.
        Command::Status | Command::Forget => Ok(()),
    }
}

/// Token state from the token file alone; never touches the network.
fn status(global: &GlobalOpts, config: &Config) -> Result<()> {
    let token_path = config.token_path()?;
    let store = FileTokenStore::new(&token_path);

    let token = match store.load() {
        Ok(Some(persisted)) => match SessionToken::from_persisted(&persisted, config.tz()?) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(error = %e, "Token file damaged");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(error = ?e, "Token file unreadable");
            None
        }
    };

    let now = Utc::now();
    let state = match token {
        None => AuthState::NoToken,
        Some(ref token) if token.needs_refresh_at(now, config.refresh_margin()) => {
            AuthState::ExpiringSoon
        }
        Some(_) => AuthState::Valid,
    };

    print_json(&json!({
        "username": global.username.as_ref().or(config.last_username.as_ref()),
        "token_file": token_path.display().to_string(),
        "state": state,
        "expires_at": token.as_ref().map(|t| t.expires_at()),
        "minutes_until_expiry": token.as_ref().map(|t| t.minutes_until_expiry(now)),
    }))
}

fn forget(global: &GlobalOpts, config: &Config) -> Result<()> {
    let username = global.username.as_ref().or(config.last_username.as_ref());

    let mut keychain_cleared = false;
    if let Some(username) = username.filter(|_| !global.no_keyring) {
        match CredentialStore::delete(username) {
            Ok(()) => keychain_cleared = true,
            Err(e) => warn!(error = ?e, "No keychain entry removed"),
        }
    }

    let token_path = config.token_path()?;
    FileTokenStore::new(&token_path).clear()?;

    print_json(&json!({
        "username": username,
        "keychain_cleared": keychain_cleared,
        "token_file_removed": token_path.display().to_string(),
    }))
}

/// Config file overlaid with command line and environment values.
fn load_config(global: &GlobalOpts) -> Result<Config> {
    let mut config = match global.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(ref key) = global.subscription_key {
        config.subscription_key = Some(key.clone());
    }
    if let Some(ref url) = global.api_url {
        config.api_url = url.clone();
    }
    if let Some(ref path) = global.token_file {
        config.token_file = Some(path.clone());
    }
    Ok(config)
}

/// Persist `config` where it was loaded from.
///
/// Command line overrides are not written back; only the remembered
/// username changes.
pub fn save_config(global: &GlobalOpts, config: &Config) -> Result<()> {
    let path = match global.config {
        Some(ref path) => path.clone(),
        None => Config::config_path()?,
    };
    let mut on_disk = Config::load_from(&path)?;
    on_disk.last_username = config.last_username.clone();
    on_disk.save_to(&path)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_ok() -> Result<()> {
    print_json(&json!({ "result": "ok" }))
}
