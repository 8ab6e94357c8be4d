use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use configuration::{AppEnvironment, Settings};
use core_types::AuthUser;
use database::{
    connect, import_legacy, run_migrations, DbRepository, ImportSummary, LegacyExport, MemoryStore,
    WellnessStore,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// The main entry point for the wellness tracker.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut settings = configuration::load_settings().context("failed to load settings")?;
    if let Some(env) = cli.env {
        settings.app_env = env;
    }
    let _guard = configuration::init_tracing(&settings)?;

    match cli.command {
        Commands::Serve(args) => handle_serve(args, &settings).await,
        Commands::Migrate => handle_migrate(&settings).await,
        Commands::ImportLegacy(args) => handle_import(args, &settings).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Track time spent on faith, life, work and health against weekly goals.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Overrides APP_ENV for this run.
    #[arg(long, global = true, value_enum)]
    env: Option<AppEnvironment>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server.
    Serve(ServeArgs),
    /// Apply pending database migrations and exit.
    Migrate,
    /// Import an export from the previous single-document version of the app.
    ImportLegacy(ImportArgs),
}

#[derive(Parser)]
struct ServeArgs {
    /// Address to bind; defaults to SERVER_ADDR.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Keep all data in process memory instead of Postgres. Lost on exit.
    #[arg(long)]
    in_memory: bool,
}

#[derive(Parser)]
struct ImportArgs {
    /// The auth user id the data belongs to.
    #[arg(long)]
    user: Uuid,

    /// The user's e-mail, used if the profile does not exist yet.
    #[arg(long)]
    email: String,

    /// Path to the exported JSON document.
    #[arg(long)]
    file: PathBuf,

    /// Print the summary as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_serve(args: ServeArgs, settings: &Settings) -> anyhow::Result<()> {
    let store: Arc<dyn WellnessStore> = if args.in_memory {
        tracing::warn!("Serving from the in-memory store; nothing will be persisted.");
        Arc::new(MemoryStore::new())
    } else {
        let pool = connect(settings.database_url()?).await?;
        run_migrations(&pool).await?;
        Arc::new(DbRepository::new(pool))
    };
    let auth = api_client::shared_client(settings)?;

    web_server::run_server(settings, args.addr, store, auth).await
}

async fn handle_migrate(settings: &Settings) -> anyhow::Result<()> {
    let pool = connect(settings.database_url()?).await?;
    run_migrations(&pool).await?;
    println!("Migrations applied.");
    Ok(())
}

async fn handle_import(args: ImportArgs, settings: &Settings) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let export = LegacyExport::from_json(&text)
        .with_context(|| format!("{} is not a legacy export", args.file.display()))?;
    let user = AuthUser {
        id: args.user,
        email: core_types::validation::validate_email(&args.email)?,
        email_confirmed_at: None,
    };

    let pool = connect(settings.database_url()?).await?;
    run_migrations(&pool).await?;
    let repo = DbRepository::new(pool);

    let progress_bar = ProgressBar::new(export.total_rows() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows")?
            .progress_chars("#>-"),
    );

    let summary = import_legacy(&repo, &user, export, || progress_bar.inc(1)).await;
    progress_bar.finish_and_clear();
    let summary = summary?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary_table(&summary));
    }
    Ok(())
}

fn summary_table(summary: &ImportSummary) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Result", "Rows"]);
    table.add_row(vec![Cell::new("Entries imported"), Cell::new(summary.entries_imported)]);
    table.add_row(vec![Cell::new("Goals imported"), Cell::new(summary.goals_imported)]);
    table.add_row(vec![Cell::new("Categories created"), Cell::new(summary.categories_created)]);
    table.add_row(vec![Cell::new("Rows skipped"), Cell::new(summary.skipped)]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_the_import_command() {
        let user = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "wellness",
            "--env",
            "staging",
            "import-legacy",
            "--user",
            &user.to_string(),
            "--email",
            "me@example.com",
            "--file",
            "export.json",
        ])
        .unwrap();
        assert_eq!(cli.env, Some(AppEnvironment::Staging));
        match cli.command {
            Commands::ImportLegacy(args) => {
                assert_eq!(args.user, user);
                assert_eq!(args.file, PathBuf::from("export.json"));
                assert!(!args.json);
            }
            _ => panic!("expected import-legacy"),
        }
    }

    #[test]
    fn serve_flags_are_optional() {
        let cli = Cli::try_parse_from(["wellness", "serve", "--in-memory"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert!(args.in_memory);
                assert!(args.addr.is_none());
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn summary_table_lists_every_counter() {
        let rendered = summary_table(&ImportSummary {
            entries_imported: 12,
            goals_imported: 3,
            categories_created: 1,
            skipped: 2,
        })
        .to_string();
        assert!(rendered.contains("Entries imported"));
        assert!(rendered.contains("12"));
        assert!(rendered.contains("Rows skipped"));
    }
}
