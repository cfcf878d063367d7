use sqlx::Row;
use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::SqlitePool;
use uuid::Uuid;

use paydesk::authz::{Role, RoleName};
use paydesk::jwt::JwtConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "paydesk admin tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Insert the admin/manager/employee roles with their built-in capability matrices
    BootstrapRoles {
        /// Overwrite matrices of roles that already exist
        #[arg(long)]
        force: bool,
    },
    /// Issue a bearer token for an existing user (development only)
    IssueToken { user_id: Uuid },
    /// Write the OpenAPI document as pretty JSON
    DumpOpenapi {
        #[arg(default_value = "openapi.json")]
        path: std::path::PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Fall back to the crate-local `.env` when the CWD has none.
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            print_status(&pool, &migrator).await?;
        }
        Commands::BootstrapRoles { force } => {
            let pool = get_pool().await?;
            bootstrap_roles(&pool, force).await?;
        }
        Commands::IssueToken { user_id } => {
            let config = JwtConfig::from_env().map_err(|e| anyhow::anyhow!(e.to_string()))?;
            let token = config.encode(user_id).map_err(|e| anyhow::anyhow!(e.to_string()))?;
            println!("{token}");
        }
        Commands::DumpOpenapi { path } => {
            let doc = serde_json::to_string_pretty(&paydesk::docs::build_openapi())?;
            std::fs::write(&path, doc).with_context(|| format!("failed to write {}", path.display()))?;
            println!("wrote {}", path.display());
        }
    }

    Ok(())
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    paydesk::db::connect(&database_url).await
}

async fn bootstrap_roles(pool: &SqlitePool, force: bool) -> anyhow::Result<()> {
    for name in [RoleName::Admin, RoleName::Manager, RoleName::Employee] {
        let role = Role::preset(name);
        let capabilities = serde_json::to_string(&role.capabilities)?;

        let existing: Option<String> = sqlx::query_scalar("SELECT id FROM roles WHERE name = ?")
            .bind(name.as_str())
            .fetch_optional(pool)
            .await?;

        match existing {
            Some(id) if force => {
                sqlx::query("UPDATE roles SET level = ?, capabilities = ? WHERE id = ?")
                    .bind(&role.level)
                    .bind(&capabilities)
                    .bind(&id)
                    .execute(pool)
                    .await?;
                println!("{:<10} updated", name);
            }
            Some(_) => println!("{:<10} exists (use --force to overwrite)", name),
            None => {
                sqlx::query("INSERT INTO roles (id, name, level, capabilities) VALUES (?, ?, ?, ?)")
                    .bind(Uuid::new_v4().to_string())
                    .bind(name.as_str())
                    .bind(&role.level)
                    .bind(&capabilities)
                    .execute(pool)
                    .await?;
                println!("{:<10} created", name);
            }
        }
    }
    Ok(())
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    let db_applied: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
            .fetch_optional(pool)
            .await?;
    let applied_versions: HashSet<i64> = if db_applied.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let version = migration.version;
        let status = if applied_versions.contains(&version) { "applied" } else { "pending" };
        let desc = migration.description.as_ref().trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, version, name);
    }

    Ok(())
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // Prefer ./migrations; fall back to the crate-local folder when the CWD differs.
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let migrator_path_display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {}", migrator_path_display))
}
