//! mysqldiff CLI
//!
//! Command-line tool printing the DDL that brings one MySQL schema in line
//! with another.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use mysqldiff::catalog::connect;
use mysqldiff::options::DEFAULT_CONCURRENCY;
use mysqldiff::prelude::*;

/// Structural diff and DDL synthesis for MySQL schemas.
#[derive(Parser)]
#[command(name = "mysqldiff")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the DDL turning the target schema into the source schema.
    Diff(DiffArgs),

    /// Write a JSON snapshot of one schema.
    Dump {
        /// Server to read (user:password@host:port).
        #[arg(short, long, env = "MYSQLDIFF_SOURCE")]
        source: ServerAddress,

        /// Schema name.
        #[arg(short, long)]
        db: String,

        /// Snapshot file to write.
        #[arg(short, long)]
        output: PathBuf,

        /// Include foreign keys.
        #[arg(short, long)]
        foreign: bool,
    },

    /// Print a shell completion script.
    Completion {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
struct DiffArgs {
    /// Source server (user:password@host:port).
    #[arg(
        short,
        long,
        env = "MYSQLDIFF_SOURCE",
        required_unless_present = "source_snapshot"
    )]
    source: Option<ServerAddress>,

    /// Target server, defaults to the source server.
    #[arg(short, long, env = "MYSQLDIFF_TARGET")]
    target: Option<ServerAddress>,

    /// Schemas to compare (source_db:target_db).
    #[arg(short, long, required_unless_present = "source_snapshot")]
    db: Option<DatabasePair>,

    /// Read the source schema from a snapshot file.
    #[arg(long, requires = "target_snapshot")]
    source_snapshot: Option<PathBuf>,

    /// Read the target schema from a snapshot file.
    #[arg(long, requires = "source_snapshot")]
    target_snapshot: Option<PathBuf>,

    /// Compare and emit comments.
    #[arg(short, long)]
    comment: bool,

    /// Compare and emit foreign keys.
    #[arg(short, long)]
    foreign: bool,

    /// Emit one ALTER TABLE statement per clause.
    #[arg(long)]
    tidb: bool,

    /// Maximum number of tables diffed at once.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Write the script to a file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl DiffArgs {
    fn options(&self) -> DiffOptions {
        DiffOptions::new()
            .with_comments(self.comment)
            .with_foreign_keys(self.foreign)
            .with_tidb(self.tidb)
            .with_concurrency(self.concurrency)
    }

    async fn load(&self) -> anyhow::Result<(SchemaSnapshot, SchemaSnapshot)> {
        if let (Some(source), Some(target)) = (&self.source_snapshot, &self.target_snapshot) {
            return Ok((
                load_snapshot(source, self.db.as_ref().map(|db| db.source.as_str())).await?,
                load_snapshot(target, self.db.as_ref().map(|db| db.target.as_str())).await?,
            ));
        }

        let source = self.source.as_ref().context("--source is required")?;
        let db = self.db.as_ref().context("--db is required")?;
        let target = self.target.as_ref().unwrap_or(source);
        let connections = u32::try_from(self.concurrency).unwrap_or(u32::MAX);

        info!(source = %source, target = %target, "Connecting");
        let source_pool = connect(source, connections).await?;
        let target_pool = if self.target.is_some() {
            connect(target, connections).await?
        } else {
            source_pool.clone()
        };

        let source = MysqlCatalog::new(source_pool, Side::Source, self.foreign)
            .load_schema(&db.source)
            .await?;
        let target = MysqlCatalog::new(target_pool, Side::Target, self.foreign)
            .load_schema(&db.target)
            .await?;
        Ok((source, target))
    }
}

async fn load_snapshot(path: &Path, schema: Option<&str>) -> anyhow::Result<SchemaSnapshot> {
    let file = SnapshotFile::new(path);
    let snapshot = match schema {
        Some(schema) => file.load_schema(schema).await?,
        None => file.read().await?,
    };
    Ok(snapshot)
}

fn write_completion(shell: Shell, out: &mut dyn Write) {
    clap_complete::generate(shell, &mut Cli::command(), "mysqldiff", out);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so the script on stdout stays clean
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Diff(args) => {
            let (source, target) = args.load().await?;
            let script = SchemaDiffer::new(args.options())
                .diff(Arc::new(source), Arc::new(target))
                .await;

            if script.is_empty() {
                info!("Schemas are in sync.");
            }
            match &args.output {
                Some(path) => {
                    tokio::fs::write(path, script.to_string())
                        .await
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), "Wrote script");
                }
                None => print!("{script}"),
            }
        }

        Commands::Dump {
            source,
            db,
            output,
            foreign,
        } => {
            let pool = connect(&source, 1).await?;
            let snapshot = MysqlCatalog::new(pool, Side::Source, foreign)
                .load_schema(&db)
                .await?;
            SnapshotFile::new(output).write(&snapshot).await?;
        }

        Commands::Completion { shell } => {
            write_completion(shell, &mut std::io::stdout());
        }
    }

    Ok(())
}
