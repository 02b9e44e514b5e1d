//! Account and session commands.
//!
//! `login` stores the token pair in auth.db through the session manager;
//! everything else reads or clears that same store. Passwords are never
//! taken as bare positional arguments, only via flag or hidden prompt.

use miette::Result;
use owo_colors::OwoColorize;
use warble_core::SessionState;
use warble_core::WarbleConfig;
use warble_core::models::{Credentials, Registration};

use crate::helpers::{describe_api_error, get_session};
use crate::output::Output;

/// Log in and persist the session.
pub async fn login(username: &str, password: Option<String>, config: &WarbleConfig) -> Result<()> {
    let output = Output::new();

    output.section(&format!("Login: {}", username.bright_cyan()));

    let password = match password {
        Some(p) => p,
        None => rpassword::prompt_password("  Password: ")
            .map_err(|e| miette::miette!("Failed to read password: {}", e))?,
    };

    if password.is_empty() {
        return Err(miette::miette!("No password provided"));
    }

    let session = get_session(config).await?;

    output.status("Authenticating...");

    session
        .login(&Credentials {
            username: username.to_string(),
            password,
        })
        .await
        .map_err(describe_api_error)?;

    output.print("");
    output.success("Logged in!");
    if let Ok(Some(user)) = session.store().get_cached_profile().await {
        output.info("User:", &user.username);
        output.info("Email:", &user.email);
    }
    output.status("Session stored in auth.db");

    Ok(())
}

/// Create a new account.
///
/// Registration does not log you in; the backend only returns the created
/// profile.
pub async fn register(username: &str, email: &str, config: &WarbleConfig) -> Result<()> {
    let output = Output::new();

    output.section(&format!("Register: {}", username.bright_cyan()));

    let password = rpassword::prompt_password("  Password: ")
        .map_err(|e| miette::miette!("Failed to read password: {}", e))?;
    let confirm = rpassword::prompt_password("  Confirm password: ")
        .map_err(|e| miette::miette!("Failed to read password: {}", e))?;

    if password.is_empty() {
        return Err(miette::miette!("No password provided"));
    }
    if password != confirm {
        return Err(miette::miette!("Passwords do not match"));
    }

    let session = get_session(config).await?;

    output.status("Creating account...");

    let user = session
        .register(&Registration {
            username: username.to_string(),
            email: email.to_string(),
            password,
        })
        .await
        .map_err(describe_api_error)?;

    output.print("");
    output.success("Account created!");
    output.info("User:", &user.username);
    output.info("Email:", &user.email);
    output.status(&format!(
        "Log in with: {} auth login {}",
        "warble".bright_green(),
        user.username
    ));

    Ok(())
}

/// Show the current session state and cached profile.
pub async fn status(config: &WarbleConfig) -> Result<()> {
    let output = Output::new();

    output.section("Session Status");

    let session = get_session(config).await?;
    let state = session.probe().await?;

    output.info("Backend:", &config.server.effective_base_url());
    output.print("");

    match state {
        SessionState::Authenticated => {
            output.success("Logged in (tokens stored)");
            if let Ok(Some(user)) = session.store().get_cached_profile().await {
                output.print("");
                output.kv("User", &user.username);
                output.kv("Email", &user.email);
                output.kv("Active", if user.is_active { "yes" } else { "no" });
            }
        }
        SessionState::Unauthenticated | SessionState::Unknown => {
            output.status("Not logged in.");
            output.list_item("Run `warble auth login <username>` to start a session");
            output.list_item("Or create an account: `warble auth register <username> <email>`");
        }
    }

    Ok(())
}

/// Log out and clear stored credentials.
///
/// Safe to run when no session exists.
pub async fn logout(config: &WarbleConfig) -> Result<()> {
    let output = Output::new();

    output.section("Logout");

    let session = get_session(config).await?;
    let had_session = session.probe().await? == SessionState::Authenticated;

    session.logout().await.map_err(describe_api_error)?;

    if had_session {
        output.success("Logged out; stored credentials cleared");
    } else {
        output.status("No active session; nothing to clear.");
    }

    Ok(())
}
