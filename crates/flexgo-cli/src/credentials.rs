//! Username and password resolution for commands that talk to the API.

use std::io::{self, Write};

use anyhow::{bail, Result};
use flexgo_core::{Config, CredentialStore, Credentials};
use tracing::{debug, warn};

use crate::cli::GlobalOpts;

/// Where the password came from; decides whether it is stored after login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordSource {
    Argument,
    Keychain,
    Prompt,
}

pub struct ResolvedCredentials {
    pub credentials: Credentials,
    pub source: PasswordSource,
    password: String,
}

/// `--username`, then the last used account, then a prompt.
pub fn resolve_username(global: &GlobalOpts, config: &Config) -> Result<String> {
    if let Some(ref username) = global.username {
        return Ok(username.clone());
    }
    if let Some(ref last) = config.last_username {
        debug!(username = %last, "Using last username");
        return Ok(last.clone());
    }
    prompt_username()
}

/// `--password`, then the keychain, then an interactive prompt.
pub fn resolve(global: &GlobalOpts, config: &Config) -> Result<ResolvedCredentials> {
    let username = resolve_username(global, config)?;

    let (password, source) = if let Some(ref password) = global.password {
        (password.clone(), PasswordSource::Argument)
    } else if !global.no_keyring && CredentialStore::has_credentials(&username) {
        (CredentialStore::get_password(&username)?, PasswordSource::Keychain)
    } else {
        (
            rpassword::prompt_password(format!("Password for {}: ", username))?,
            PasswordSource::Prompt,
        )
    };

    if password.is_empty() {
        bail!("Username and password required");
    }

    Ok(ResolvedCredentials {
        credentials: Credentials::new(username, password.clone()),
        source,
        password,
    })
}

impl ResolvedCredentials {
    /// Remember the account after a successful login.
    ///
    /// The password is only written to the keychain when the API accepted
    /// it in this session; a login served from the token file proves nothing
    /// about it.
    pub fn remember(&self, global: &GlobalOpts, config: &mut Config, password_accepted: bool) {
        let username = self.credentials.username();

        if stores_password(self.source, global.no_keyring, password_accepted) {
            if let Err(e) = CredentialStore::store(username, &self.password) {
                warn!(error = %e, "Failed to store credentials");
            }
        } else if !password_accepted && self.source != PasswordSource::Keychain {
            debug!("Password not verified this session; keychain left untouched");
        }

        if config.last_username.as_deref() != Some(username) {
            config.last_username = Some(username.to_string());
            if let Err(e) = crate::commands::save_config(global, config) {
                warn!(error = %e, "Failed to save config");
            }
        }
    }
}

fn stores_password(source: PasswordSource, no_keyring: bool, password_accepted: bool) -> bool {
    password_accepted && !no_keyring && source != PasswordSource::Keychain
}

fn prompt_username() -> Result<String> {
    eprint!("Username: ");
    io::stderr().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    let username = username.trim();
    if username.is_empty() {
        bail!("Username and password required");
    }
    Ok(username.to_string())
}
