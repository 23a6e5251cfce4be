//! Sign-in, registration and session inspection for the command line.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{bail, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use shared::{RegisterRequest, User};

use crate::api::{ApiError, Backend};
use crate::dashboard::describe_failure;

pub const INVALID_CREDENTIALS: &str = "Invalid username or password";
pub const REGISTER_FAILED: &str = "Registration failed. The username or email might already be taken.";
pub const NOT_LOGGED_IN: &str = "Not logged in. Run 'fruit login' to authenticate.";

/// Exchange credentials for a token and persist the session.
pub async fn sign_in(backend: &Backend, username: &str, password: &str) -> Result<User> {
    if username.trim().is_empty() || password.is_empty() {
        bail!("Please enter both username and password");
    }
    let auth = match backend.core.login(username.trim(), password).await {
        Ok(auth) => auth,
        Err(ApiError::Unauthorized) => bail!(INVALID_CREDENTIALS),
        Err(e) => bail!(describe_failure(&e, INVALID_CREDENTIALS)),
    };
    backend.session().establish(&auth.token, auth.user.clone())?;
    Ok(auth.user)
}

pub async fn sign_up(backend: &Backend, request: &RegisterRequest) -> Result<User> {
    let auth = match backend.core.register(request).await {
        Ok(auth) => auth,
        Err(e) => bail!(describe_failure(&e, REGISTER_FAILED)),
    };
    backend.session().establish(&auth.token, auth.user.clone())?;
    Ok(auth.user)
}

pub async fn login(backend: &Backend, username: Option<String>) -> Result<String> {
    let username = match username {
        Some(name) => name,
        None => prompt("Username")?,
    };
    let password = prompt_secret("Password")?;
    let user = sign_in(backend, &username, &password).await?;
    Ok(format!("Logged in as {} ({})", user.display_name(), user.username))
}

#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

pub async fn register(backend: &Backend, registration: Registration) -> Result<String> {
    let username = registration.username.map(Ok).unwrap_or_else(|| prompt("Username"))?;
    let email = registration.email.map(Ok).unwrap_or_else(|| prompt("Email"))?;
    let full_name = registration.full_name.map(Ok).unwrap_or_else(|| prompt("Full name"))?;
    let password = prompt_secret("Password")?;

    if [&username, &email, &full_name, &password].iter().any(|v| v.trim().is_empty()) {
        bail!(crate::forms::REQUIRED_FIELDS);
    }

    let request = RegisterRequest {
        username: username.trim().to_string(),
        password,
        email: email.trim().to_string(),
        full_name: full_name.trim().to_string(),
        phone: registration.phone.filter(|p| !p.trim().is_empty()),
        role: None,
    };
    let user = sign_up(backend, &request).await?;
    Ok(format!("Account created. Logged in as {} ({})", user.display_name(), user.username))
}

pub fn logout(backend: &Backend) -> String {
    let session = backend.session();
    if session.token().is_none() {
        return "Not logged in".to_string();
    }
    session.logout();
    "Logged out successfully".to_string()
}

/// Check the stored token against the core service.
pub async fn whoami(backend: &Backend) -> Result<String> {
    let session = backend.session();
    if !session.init() {
        return Ok(NOT_LOGGED_IN.to_string());
    }
    if !session.revalidate(&backend.core).await {
        bail!("Session is no longer valid. Run 'fruit login' to sign in again.");
    }
    let Some(user) = session.current_user() else {
        return Ok(NOT_LOGGED_IN.to_string());
    };
    Ok(format!(
        "Logged in as {} ({})\nEmail: {}\nRole: {}",
        user.display_name(),
        user.username,
        user.email,
        if user.is_admin() { "admin" } else { "user" }
    ))
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

enum SecretInput {
    More,
    Done,
    Cancelled,
}

fn secret_key(secret: &mut String, key: KeyEvent) -> SecretInput {
    if key.kind != KeyEventKind::Press {
        return SecretInput::More;
    }
    match key.code {
        KeyCode::Enter => SecretInput::Done,
        KeyCode::Esc => SecretInput::Cancelled,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => SecretInput::Cancelled,
        KeyCode::Backspace => {
            secret.pop();
            SecretInput::More
        }
        KeyCode::Char(c) => {
            secret.push(c);
            SecretInput::More
        }
        _ => SecretInput::More,
    }
}

/// Like [`prompt`], but typed characters are not echoed. Piped input is read
/// as a plain line.
fn prompt_secret(label: &str) -> Result<String> {
    if !io::stdin().is_terminal() {
        return prompt(label);
    }
    print!("{}: ", label);
    io::stdout().flush()?;

    terminal::enable_raw_mode()?;
    let read = read_secret();
    terminal::disable_raw_mode()?;
    println!();
    read
}

fn read_secret() -> Result<String> {
    let mut secret = String::new();
    loop {
        if let Event::Key(key) = event::read()? {
            match secret_key(&mut secret, key) {
                SecretInput::More => {}
                SecretInput::Done => return Ok(secret),
                SecretInput::Cancelled => bail!("Cancelled"),
            }
        }
    }
}
