//! Administration and backup CLI for a MemberCRM store.
//!
//! # Responsibility
//! - Export/import whole stores as JSON for backup and restore.
//! - Bootstrap operator accounts and reset their passwords.
//! - Offer quick local sanity checks (record counts, password scoring).

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use membercrm_core::{
    core_version, default_log_level, init_logging, strength_label, validate_password, AuthService,
    ExportPayload, MemorySessionSlot, NewUser, Store, StoreConfig, UserRole,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store file
    #[arg(short, long, env = "MEMBERCRM_DB", default_value = "membercrm.sqlite3")]
    database: PathBuf,

    /// Absolute directory for rolling log files; logging is off when omitted
    #[arg(long, env = "MEMBERCRM_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write every collection as one JSON object
    Export {
        /// Output file; stdout when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Replace the collections present in a JSON export
    Import {
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Create an operator account
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, env = "MEMBERCRM_PASSWORD")]
        password: String,
        /// Grant the admin role
        #[arg(long)]
        admin: bool,
    },
    /// Replace a user's password with a generated temporary one
    ResetPassword {
        #[arg(required = true)]
        email: String,
    },
    /// Score a candidate password
    CheckPassword {
        #[arg(required = true)]
        password: String,
    },
    /// Print record counts per collection
    Stats,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Export { .. } => "export",
            Self::Import { .. } => "import",
            Self::CreateUser { .. } => "create-user",
            Self::ResetPassword { .. } => "reset-password",
            Self::CheckPassword { .. } => "check-password",
            Self::Stats => "stats",
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).map_err(|err| anyhow!("failed to start logging: {err}"))?;
    }

    if let Commands::CheckPassword { password } = &cli.command {
        check_password(password);
        return Ok(());
    }

    let store = Store::open(StoreConfig::file(&cli.database))
        .await
        .with_context(|| format!("failed to open store `{}`", cli.database.display()))?;
    info!(
        "event=cli_command module=cli status=start command={}",
        cli.command.name()
    );

    match &cli.command {
        Commands::Export { out } => export(&store, out.as_deref()).await?,
        Commands::Import { file } => import(&store, file).await?,
        Commands::CreateUser {
            email,
            name,
            password,
            admin,
        } => {
            let role = if *admin { UserRole::Admin } else { UserRole::User };
            let report = validate_password(password);
            if !report.is_strong {
                bail!("password is too weak: {}", report.feedback.join("; "));
            }
            let user = store
                .users()
                .create_user(&NewUser::new(email, password, name).with_role(role))
                .await
                .context("failed to create user")?;
            println!("created user {} ({})", user.email, user.id);
        }
        Commands::ResetPassword { email } => {
            let auth = AuthService::for_store(&store, Arc::new(MemorySessionSlot::new()));
            auth.reset_password(email)
                .await
                .with_context(|| format!("failed to reset password for `{email}`"))?;
            println!("password reset for {email}");
        }
        Commands::Stats => stats(&store).await?,
        Commands::CheckPassword { .. } => {}
    }

    store.close().await;
    Ok(())
}

async fn export(store: &Store, out: Option<&Path>) -> Result<()> {
    let payload = store.export_all().await.context("export failed")?;
    let json = serde_json::to_string_pretty(&payload)?;
    match out {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write `{}`", path.display()))?;
            eprintln!("exported {} collections to {}", payload.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn import(store: &Store, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read `{}`", file.display()))?;
    let payload: ExportPayload =
        serde_json::from_str(&raw).context("import file is not a collection map")?;
    store.import_all(&payload).await.context("import failed")?;
    for (collection, records) in &payload {
        println!("{collection}: {} records", records.len());
    }
    Ok(())
}

async fn stats(store: &Store) -> Result<()> {
    println!("membercrm_core version={}", core_version());
    println!("schema_version={}", store.db().schema_version().await?);
    println!("users={}", store.users().records().count().await?);
    println!("members={}", store.members().records().count().await?);
    println!("contracts={}", store.contracts().records().count().await?);
    println!("relations={}", store.relations().records().count().await?);
    println!("changelog={}", store.changelog().records().count().await?);
    println!("settings={}", store.settings().records().count().await?);
    Ok(())
}

fn check_password(password: &str) {
    let report = validate_password(password);
    println!("score={} ({})", report.score, strength_label(report.score));
    for line in &report.feedback {
        println!("- {line}");
    }
}
