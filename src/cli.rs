//! Command-line entry point for applications that ship atomic migrations
//!
//! An application builds its [`MigrationRegistry`] and hands it to [`attach`] from `main`:
//!
//! ```rust,no_run
//! use lifeguard_atomic::{cli, MigrationRegistry};
//!
//! fn main() -> std::process::ExitCode {
//!     let registry = MigrationRegistry::new();
//!     // registry.register_atomic(V001CreateAccountTable)?;
//!     cli::attach(registry, std::env::args_os()).into()
//! }
//! ```
//!
//! `--migrate` applies pending migrations, `--undo [N]` reverts the last `N` (default 1).
//! Without either flag nothing is executed.

use crate::migration::{ExitStatus, MigrationInfo, MigrationRegistry, Migrator, UndoRequest};
use crate::{connect, DatabaseConfig, MayPostgresExecutor};
use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lifeguard-atomic")]
#[command(about = "Reversible migrations with single-transaction undo")]
pub struct Cli {
    /// Apply pending migrations
    #[arg(long)]
    pub migrate: bool,

    /// Undo the last applied migration(s)
    #[arg(
        long = "undo",
        visible_alias = "undo-migration",
        value_name = "COUNT",
        num_args = 0..=1,
        default_missing_value = "1"
    )]
    pub undo: Option<u32>,

    /// Show applied and pending migrations
    #[arg(long)]
    pub info: bool,

    /// Database connection URL (overrides configuration)
    #[arg(long)]
    pub url: Option<String>,

    /// Database user (overrides configuration)
    #[arg(long)]
    pub user: Option<String>,

    /// Database password (overrides configuration)
    #[arg(long)]
    pub password: Option<String>,

    /// Name of the migration history table
    #[arg(long)]
    pub history_table: Option<String>,

    /// Configuration file
    #[arg(long, default_value = "config/config.toml")]
    pub config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    fn has_action(&self) -> bool {
        self.migrate || self.undo.is_some() || self.info
    }
}

/// Parse `args` (program name first) and run the requested action
///
/// Returns `ExitStatus::Ok` on success (or when no action is requested) and
/// `ExitStatus::Usage` when parsing, loading configuration, connecting, migrating or any
/// undo step fails.
pub fn attach<I, T>(registry: MigrationRegistry, args: I) -> ExitStatus
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let status = if e.use_stderr() {
                ExitStatus::Usage
            } else {
                ExitStatus::Ok
            };
            // Help and version output go to stdout, parse errors to stderr
            let _ = e.print();
            return status;
        }
    };

    init_logging(&cli);

    if !cli.has_action() {
        log::debug!("No action requested");
        return ExitStatus::Ok;
    }

    let undo = match cli.undo.map(UndoRequest::new).transpose() {
        Ok(undo) => undo,
        Err(e) => {
            eprintln!("{} {e}", "❌ Error:".red());
            return e.exit_status();
        }
    };

    dotenv::dotenv().ok();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {e:#}", "❌ Error:".red());
            return ExitStatus::Usage;
        }
    };

    let migrator = match connect_migrator(&config, registry) {
        Ok(migrator) => migrator,
        Err(e) => {
            eprintln!("{} {e:#}", "❌ Error:".red());
            return ExitStatus::Usage;
        }
    };

    if cli.info {
        match migrator.info() {
            Ok(info) => print_info(&info),
            Err(e) => {
                eprintln!("{} {e}", "❌ Error:".red());
                return e.exit_status();
            }
        }
    }

    if cli.migrate {
        return handle_migrate(&migrator, cli.quiet);
    }

    if let Some(request) = undo {
        return handle_undo(&migrator, request, cli.quiet);
    }

    ExitStatus::Ok
}

fn init_logging(cli: &Cli) {
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    // A logger installed by the host application wins
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .try_init();
}

fn load_config(cli: &Cli) -> anyhow::Result<DatabaseConfig> {
    let mut config = DatabaseConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    if let Some(url) = &cli.url {
        config.url.clone_from(url);
    }
    if let Some(user) = &cli.user {
        config.user.clone_from(user);
    }
    if let Some(password) = &cli.password {
        config.password.clone_from(password);
    }
    if let Some(table) = &cli.history_table {
        config.history_table.clone_from(table);
    }

    Ok(config)
}

fn connect_migrator(config: &DatabaseConfig, registry: MigrationRegistry) -> anyhow::Result<Migrator> {
    let connection_string = config
        .connection_string()
        .context("Invalid database URL")?;
    let client = connect(&connection_string).context("Error connecting to database")?;

    let executor = MayPostgresExecutor::new(client);
    let ledger = executor.ledger(config.history_table.clone());

    Ok(Migrator::new(executor, ledger, registry).with_installed_by(config.installed_by()))
}

fn handle_migrate(migrator: &Migrator, quiet: bool) -> ExitStatus {
    match migrator.migrate() {
        Ok(applied) => {
            if !quiet {
                if applied > 0 {
                    println!("{} Successfully applied {applied} migration(s)", "✅".green());
                } else {
                    println!("{} No migrations to apply", "✅".green());
                }
            }
            ExitStatus::Ok
        }
        Err(e) => {
            eprintln!("{} {e}", "❌ Error:".red());
            e.exit_status()
        }
    }
}

fn handle_undo(migrator: &Migrator, request: UndoRequest, quiet: bool) -> ExitStatus {
    let report = migrator.undo(request);

    if !quiet {
        for script in &report.reverted {
            println!("{} Undone {script}", "↩".green());
        }
    }

    if let Some(e) = &report.error {
        eprintln!("{} {e}", "❌ Error:".red());
    }

    report.status
}

fn print_info(info: &MigrationInfo) {
    println!("\n📊 Migration Status\n");

    if info.applied.is_empty() {
        println!("✅ Applied Migrations: None");
    } else {
        println!("✅ Applied Migrations ({}):", info.applied_count());
        for entry in &info.applied {
            println!(
                "  ✓ {} {} ({}, {}ms)",
                entry.version.as_deref().unwrap_or("R"),
                entry.description,
                entry.installed_on.format("%Y-%m-%d %H:%M:%S"),
                entry.execution_time
            );
        }
    }

    println!();

    if info.pending.is_empty() {
        println!("⏳ Pending Migrations: None");
    } else {
        println!("⏳ Pending Migrations ({}):", info.pending_count());
        for pending in &info.pending {
            let version = pending
                .version
                .as_ref()
                .map_or_else(|| "R".to_string(), ToString::to_string);
            let marker = if pending.reversible { "" } else { " (forward only)" };
            println!("  ⏳ {version} {}{marker}", pending.description);
        }
    }

    if let Some(version) = info.latest_applied_version() {
        println!("\n📌 Current version: {}", version.to_string().cyan());
    }
    if let Some(current) = &info.current {
        println!("↩ Next undo: {}", current.script.yellow());
    }
    if info.is_up_to_date() {
        println!("{} Schema is up to date", "✅".green());
    } else if let Some(version) = info.next_pending_version() {
        println!("⏭ Next migration: {}", version.to_string().cyan());
    }

    println!(
        "\n📈 Summary: {} applied, {} pending",
        info.applied_count(),
        info.pending_count()
    );
}
