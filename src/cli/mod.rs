// Server operations CLI: `roost serve | migrate | create-admin`.
// The HTTP API is the product; this covers what an operator needs from a
// shell on the host.

use clap::{Parser, Subcommand};

use crate::app;
use crate::auth::password;
use crate::database::models::{NewUser, User, ROLE_ADMIN};
use crate::database::{is_unique_violation, Database};
use crate::validation::{self, ValidationErrors};

#[derive(Parser)]
#[command(name = "roost")]
#[command(about = "Roost - social network backend server and admin tools")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP API server")]
    Serve {
        #[arg(long, help = "Port to listen on (default: ROOST_API_PORT, PORT, then 3000)")]
        port: Option<u16>,
    },

    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Create an administrator account")]
    CreateAdmin {
        #[arg(help = "Username for the new administrator")]
        username: String,

        #[arg(help = "Password (min 8 characters)")]
        password: String,

        #[arg(long, help = "Optional email address")]
        email: Option<String>,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { port } => serve(port).await,
        Commands::Migrate => migrate().await,
        Commands::CreateAdmin {
            username,
            password,
            email,
        } => create_admin(username, password, email).await,
    }
}

async fn serve(port_flag: Option<u16>) -> anyhow::Result<()> {
    let config = crate::config::config();
    tracing::info!("Starting Roost API in {:?} mode", config.environment);

    // Best effort: a missing database still serves /health as degraded
    if let Err(e) = Database::migrate().await {
        tracing::warn!("Skipping migrations: {}", e);
    }

    let port = port_flag
        .or_else(|| {
            std::env::var("ROOST_API_PORT")
                .ok()
                .or_else(|| std::env::var("PORT").ok())
                .and_then(|s| s.parse::<u16>().ok())
        })
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    println!("🚀 Roost API server listening on http://{}", bind_addr);

    axum::serve(listener, app::app()).await?;
    Ok(())
}

async fn migrate() -> anyhow::Result<()> {
    Database::migrate().await?;
    Database::close().await;
    println!("Migrations applied");
    Ok(())
}

/// Registration always creates plain users; admin accounts only come from
/// this command, run by someone with shell access to the host.
async fn create_admin(
    username: String,
    password: String,
    email: Option<String>,
) -> anyhow::Result<()> {
    let mut errors = ValidationErrors::new();
    validation::check_username(&mut errors, &username);
    validation::check_password(&mut errors, &password);
    if let Some(email) = email.as_deref() {
        validation::check_email(&mut errors, email);
    }
    if let Err(errors) = errors.into_result() {
        anyhow::bail!("invalid input: {}", errors);
    }

    let password_hash = password::hash(&password)?;
    let pool = Database::pool().await?;

    let new_user = NewUser {
        username: &username,
        email: email.as_deref(),
        password_hash: &password_hash,
        display_name: None,
        role: ROLE_ADMIN,
    };

    let created = User::create(&pool, new_user).await;
    Database::close().await;

    match created {
        Ok(admin) => {
            println!("Administrator '{}' created ({})", admin.username, admin.id);
            Ok(())
        }
        Err(e) if is_unique_violation(&e) => {
            anyhow::bail!("username or email is already taken")
        }
        Err(e) => Err(e.into()),
    }
}
