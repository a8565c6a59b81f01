use super::ui;
use crate::core::session::{Session, SessionStore};
use crate::providers::ApiClient;
use crate::providers::auth::{self, Registration};
use anyhow::{Context, Result, bail};
use comfy_table::Cell;
use console::Term;

/// Uses the given password or asks for it without echo.
fn password_or_prompt(password: Option<&str>, prompt: &str) -> Result<String> {
    if let Some(p) = password {
        return Ok(p.to_string());
    }
    let term = Term::stderr();
    term.write_str(prompt)?;
    let password = term
        .read_secure_line()
        .context("Failed to read password")?;
    if password.is_empty() {
        bail!("Password cannot be empty");
    }
    Ok(password)
}

pub async fn login(
    client: &ApiClient,
    store: &dyn SessionStore,
    username: &str,
    password: Option<&str>,
) -> Result<Session> {
    let password = password_or_prompt(password, "Password: ")?;
    let session = ui::with_spinner("Signing in...", auth::login(client, username, &password)).await?;
    store.save(&session)?;
    println!(
        "Signed in as {} ({})",
        session
            .user
            .as_ref()
            .map_or(username, |u| u.username.as_str()),
        session.role()
    );
    Ok(session)
}

pub async fn register(
    client: &ApiClient,
    username: &str,
    email: &str,
    password: Option<&str>,
) -> Result<()> {
    let password = password_or_prompt(password, "Choose a password: ")?;
    let registration = Registration {
        username: username.to_string(),
        email: email.to_string(),
        password,
    };
    auth::register(client, &registration).await?;
    println!("Account {username} created. Sign in with `lahan login {username}`.");
    Ok(())
}

pub async fn logout(client: &ApiClient, store: &dyn SessionStore) -> Result<()> {
    auth::logout(client).await;
    store.clear()?;
    println!("Signed out");
    Ok(())
}

pub fn display_identity(session: &Session) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Account"), ui::header_cell("")]);
    match &session.user {
        Some(user) => {
            table.add_row(vec![Cell::new("Username"), Cell::new(&user.username)]);
            table.add_row(vec![
                Cell::new("Email"),
                Cell::new(user.email.as_deref().unwrap_or("-")),
            ]);
        }
        None => {
            table.add_row(vec![Cell::new("Username"), Cell::new("(unknown)")]);
        }
    }
    table.add_row(vec![Cell::new("Role"), Cell::new(session.role())]);
    table.to_string()
}

pub fn whoami(session: &Session) -> Result<()> {
    if !session.is_authenticated() {
        bail!("Not signed in. Run `lahan login <username>` first.");
    }
    println!("{}", display_identity(session));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::User;
    use crate::core::session::Tokens;

    #[test]
    fn test_display_identity_defaults_unknown_role_to_viewer() {
        let session = Session::new(
            Some(User {
                id: 4,
                username: "sari".to_string(),
                email: Some("sari@example.com".to_string()),
                role: Some("Petani".to_string()),
            }),
            Tokens {
                access: "A".to_string(),
                refresh: None,
            },
        );
        let output = display_identity(&session);
        assert!(output.contains("sari@example.com"));
        assert!(output.contains("Viewer"));
    }

    #[test]
    fn test_whoami_requires_session() {
        assert!(whoami(&Session::default()).is_err());
    }
}
