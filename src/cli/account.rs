use super::{AppContext, ui};
use crate::core::profile::{ProfileUpdate, UserProfile};
use crate::core::session::{Session, SignUpOutcome};
use anyhow::{Result, bail};
use tracing::info;

fn password_or_prompt(password: Option<String>) -> Result<String> {
    let password = match password {
        Some(password) => password,
        None => ui::prompt_password("Password: ")?,
    };
    if password.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(password)
}

fn validate_display_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Name must not be empty");
    }
    Ok(name)
}

/// Checks sign-up input. `confirmation` is the second entry of a prompted
/// password and must match the first.
pub fn validate_sign_up(name: &str, password: &str, confirmation: Option<&str>) -> Result<()> {
    validate_display_name(name)?;
    if password.is_empty() {
        bail!("Password must not be empty");
    }
    if confirmation.is_some_and(|confirmation| confirmation != password) {
        bail!("Passwords do not match");
    }
    Ok(())
}

pub fn display_account(session: &Session, profile: Option<&UserProfile>) -> String {
    let name = profile
        .map(|p| p.name.as_str())
        .or(session.user.name.as_deref())
        .unwrap_or("-");
    let email = session.user.email.as_deref().unwrap_or("-");
    let mut output = format!(
        "Signed in as {} <{}>",
        ui::style_text(name, ui::StyleType::TotalLabel),
        email
    );
    if let Some(avatar) = profile.and_then(|p| p.avatar_url.as_deref()) {
        output.push_str(&format!("\nAvatar: {avatar}"));
    }
    if let Some(expires_at) = session.expires_at {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                &format!("Session valid until {}", expires_at.format("%Y-%m-%d %H:%M UTC")),
                ui::StyleType::Subtle
            )
        ));
    }
    output
}

pub async fn sign_up(
    context: &AppContext,
    email: &str,
    name: &str,
    password: Option<String>,
) -> Result<()> {
    let name = validate_display_name(name)?;
    let backend = context.backend()?;
    let (password, confirmation) = match password {
        Some(password) => (password, None),
        None => (
            ui::prompt_password("Password: ")?,
            Some(ui::prompt_password("Confirm password: ")?),
        ),
    };
    validate_sign_up(name, &password, confirmation.as_deref())?;
    match backend.sessions.sign_up(email, &password, name).await? {
        SignUpOutcome::SignedIn(session) => {
            info!("Signed up user {}", session.user.id);
            println!(
                "{}",
                display_account(&session, backend.sessions.profile().as_ref())
            );
        }
        SignUpOutcome::ConfirmationRequired(_) => {
            println!("Account created. Check {email} to confirm it, then run `xrate login`.");
        }
    }
    Ok(())
}

pub async fn login(context: &AppContext, email: &str, password: Option<String>) -> Result<()> {
    let backend = context.backend()?;
    let password = password_or_prompt(password)?;
    let session = backend.sessions.sign_in(email, &password).await?;
    info!("Signed in user {}", session.user.id);
    println!(
        "{}",
        display_account(&session, backend.sessions.profile().as_ref())
    );
    Ok(())
}

pub async fn logout(context: &AppContext) -> Result<()> {
    let backend = context.backend()?;
    if backend.sessions.current().is_none() {
        println!("Not signed in");
        return Ok(());
    }
    backend.sessions.sign_out().await?;
    println!("Signed out");
    Ok(())
}

pub async fn whoami(context: &AppContext) -> Result<()> {
    let session = context.require_session()?;
    let profile = context.backend()?.sessions.load_profile().await?;
    println!("{}", display_account(&session, profile.as_ref()));
    Ok(())
}

pub async fn update_profile(context: &AppContext, update: ProfileUpdate) -> Result<()> {
    if update.is_empty() {
        bail!("Nothing to update; pass --name or --avatar-url");
    }
    let update = ProfileUpdate {
        name: update
            .name
            .as_deref()
            .map(validate_display_name)
            .transpose()?
            .map(str::to_string),
        ..update
    };
    let session = context.require_session()?;
    let backend = context.backend()?;
    let profile = backend.profiles.update_profile(&session, &update).await?;
    backend.sessions.set_profile(profile.clone());
    println!("{}", display_account(&session, Some(&profile)));
    Ok(())
}
