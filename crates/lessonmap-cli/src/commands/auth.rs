use crate::context::AppContext;
use anyhow::Result;
use colored::Colorize;

pub async fn signin(ctx: &AppContext, email: &str, name: &str) -> Result<()> {
    ctx.auth().initiate_sign_in(email, name).await?;
    println!("A passcode was sent to {}.", email.bold());
    println!(
        "Run {} to finish signing in.",
        format!("lessonmap verify --email {email} --name '{name}' --otp <code>").cyan()
    );
    Ok(())
}

pub async fn verify(ctx: &AppContext, email: &str, name: &str, otp: &str) -> Result<()> {
    let cookie = ctx.auth().verify_otp(email, name, otp).await?;
    println!(
        "{} Signed in as {} (session valid until {})",
        "✔".green(),
        cookie.user_name.bold(),
        cookie.expires_at().format("%Y-%m-%d %H:%M UTC")
    );
    Ok(())
}

pub async fn logout(ctx: &AppContext) -> Result<()> {
    let auth = ctx.auth();
    if auth.current_session().is_none() {
        println!("Not signed in.");
        return Ok(());
    }
    if !auth.logout().await {
        anyhow::bail!("logout failed");
    }
    Ok(())
}

pub async fn whoami(ctx: &AppContext) -> Result<()> {
    let auth = ctx.auth();
    let Some(session) = auth.current_session() else {
        println!("Not signed in.");
        return Ok(());
    };

    match auth.profile(&session.user_id).await {
        Ok(profile) => println!("{} <{}>", profile.name.bold(), profile.email),
        Err(err) => {
            tracing::warn!("[Auth] Could not fetch profile: {}", err);
            println!("{}", session.user_name.bold());
        }
    }
    println!(
        "user id {}, session expires {}",
        session.user_id,
        session.expires_at().format("%Y-%m-%d %H:%M UTC")
    );
    Ok(())
}

pub async fn rename(ctx: &AppContext, name: &str) -> Result<()> {
    let auth = ctx.auth();
    let session = auth.require_session()?;
    auth.update_profile(&session.user_id, name).await?;
    println!("{} Profile name set to {}", "✔".green(), name.trim().bold());
    Ok(())
}
