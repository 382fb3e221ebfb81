//! Development bringup tool
//!
//! Creates the database schema and, when the instance looks fresh (fewer
//! than 20 users), seeds deterministic fake data and prints one working
//! login.

use anyhow::{Context, Result};
use clap::Parser;
use ragtime_common::config::Config;
use ragtime_common::db::init::{init_database, init_database_in_memory};
use ragtime_common::db::users;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ragtime_web::fake;

/// How many users a populated instance is expected to have
const SEED_THRESHOLD: i64 = 20;

#[derive(Parser, Debug)]
#[command(name = "bringup")]
#[command(about = "Initialize and seed a Ragtime database")]
#[command(version)]
struct Args {
    /// Root folder holding the SQLite database
    #[arg(short, long, env = "RAGTIME_ROOT_FOLDER")]
    root_folder: Option<String>,

    /// Seed fake data even when the database already has users
    #[arg(long)]
    force_seed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bringup=info,ragtime_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = Config::load(args.root_folder.as_deref()).context("Failed to load configuration")?;
    info!("Bringing up Ragtime ({} profile)", config.profile.name());

    let pool = match config.database_path() {
        Some(path) => {
            info!("Database: {}", path.display());
            init_database(&path).await.context("Failed to initialize database")?
        }
        None => init_database_in_memory()
            .await
            .context("Failed to initialize in-memory database")?,
    };

    let user_count = users::count_users(&pool).await?;
    if user_count >= SEED_THRESHOLD && !args.force_seed {
        info!("Database already has {} users, not seeding", user_count);
        println!("Database ready ({} users).", user_count);
        if let Some(user) = users::first_user(&pool).await? {
            println!("Earliest account: {}", user.email);
        }
        return Ok(());
    }

    info!("Seeding fake data ({} existing users)", user_count);
    let sample = fake::seed_all(&pool, SEED_THRESHOLD as usize, config.admin_email.as_deref())
        .await
        .context("Failed to seed fake data")?;

    println!("Database ready.");
    if let Some(user) = sample {
        println!("Sample login: {} / {}", user.email, fake::FAKE_PASSWORD);
    }

    Ok(())
}
