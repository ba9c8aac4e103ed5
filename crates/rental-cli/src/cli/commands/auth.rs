//! Login, signup, logout and whoami.

use std::io::{self, BufRead, Write};

use anyhow::{Context as _, Result, bail};
use chrono::Utc;
use rental_core::session::AccessTokenInfo;
use rental_core::types::{SignupRequest, User};

use super::Context;

pub async fn login(ctx: &Context, email: &str, password: Option<String>) -> Result<()> {
    let password = resolve_password(password)?;
    let user = ctx
        .session
        .login(email, &password)
        .await
        .context("login failed")?;
    ctx.output.emit(&user, |user| {
        println!("Logged in as {} <{}>", user.display_name(), user.email);
    })
}

pub async fn signup(
    ctx: &Context,
    email: &str,
    name: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let password = resolve_password(password)?;
    let request = SignupRequest {
        email: email.to_string(),
        password,
        name: name.filter(|n| !n.trim().is_empty()),
    };
    let user = ctx
        .session
        .signup(&request)
        .await
        .context("signup failed")?;
    ctx.output.emit(&user, |user| {
        println!("Created account for {} <{}>", user.display_name(), user.email);
    })
}

pub async fn logout(ctx: &Context) -> Result<()> {
    let had_session = ctx.client().tokens().has_credentials();
    ctx.session.logout().await;
    if had_session {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

pub async fn whoami(ctx: &Context) -> Result<()> {
    let state = ctx.session.bootstrap().await;
    let token = ctx.session.access_token_info();

    let user: Option<&User> = state.user();
    ctx.output.emit(&user, |user| match user {
        Some(user) => {
            println!("{} <{}>", user.display_name(), user.email);
            println!("id: {}", user.id);
            if let Some(token) = &token {
                println!("access token: {}", describe_token(token));
            }
        }
        None => println!("Not logged in."),
    })
}

fn describe_token(token: &AccessTokenInfo) -> String {
    match token.expires_at {
        Some(expires_at) if token.expired => format!("{} (expired {expires_at})", token.masked),
        Some(expires_at) => {
            let minutes = (expires_at - Utc::now()).num_minutes();
            format!("{} (expires in {minutes} min)", token.masked)
        }
        None => token.masked.clone(),
    }
}

/// Uses the flag or env value, else reads one line from stdin.
fn resolve_password(password: Option<String>) -> Result<String> {
    if let Some(password) = password.filter(|p| !p.is_empty()) {
        return Ok(password);
    }

    eprint!("Password: ");
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read password from stdin")?;

    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        bail!("Password is required");
    }
    Ok(password.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_describe_token() {
        let opaque = AccessTokenInfo {
            masked: "***".to_string(),
            user_id: None,
            expires_at: None,
            expired: true,
        };
        assert_eq!(describe_token(&opaque), "***");

        let live = AccessTokenInfo {
            masked: "eyJhbGciOiJI...".to_string(),
            user_id: Some("u1".to_string()),
            expires_at: Some(Utc::now() + Duration::minutes(30) + Duration::seconds(5)),
            expired: false,
        };
        assert_eq!(describe_token(&live), "eyJhbGciOiJI... (expires in 30 min)");
    }
}
