//! Account management commands.

use console::style;

use crate::auth::{AuthError, AuthService};
use crate::config::Settings;

/// Create an account from the command line.
pub async fn cmd_user_add(
    settings: &Settings,
    email: &str,
    password: &str,
    admin: bool,
) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;

    let auth = AuthService::new(ctx, &settings.admin_email);
    match auth.create_user(email, password, admin).await {
        Ok(user) => {
            println!(
                "{} Created {}{}",
                style("✓").green(),
                user.email,
                if user.is_admin { " (admin)" } else { "" }
            );
            Ok(())
        }
        Err(e @ (AuthError::UserExists | AuthError::MissingCredentials)) => {
            eprintln!("{} {}", style("✗").red(), e);
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// List accounts.
pub async fn cmd_user_list(settings: &Settings) -> anyhow::Result<()> {
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;

    let users = ctx.users().list().await?;
    if users.is_empty() {
        println!("{} No users yet", style("!").yellow());
        return Ok(());
    }

    println!("{:<6} {:<40} {:<6} Created", "ID", "Email", "Admin");
    println!("{}", "-".repeat(72));
    for user in users {
        println!(
            "{:<6} {:<40} {:<6} {}",
            user.id,
            user.email,
            if user.is_admin { "yes" } else { "" },
            user.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}
