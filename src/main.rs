use clap::Parser;
use sqlmig::utils::namespace_for;
use sqlmig::{
    read_config, DirSource, MemoryDatabase, MemoryEngine, MigrationSource, Orchestrator,
    ResultSet,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_CONFIG: &str = "sqlmig.json";

/// sqlmig - check migration directories against an in-memory database
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Migration directories, each registered as one source named after the directory
    #[arg(required = true)]
    dirs: Vec<PathBuf>,

    /// Configuration file (JSON). Missing file means defaults.
    #[arg(short, long, env = "SQLMIG_CONFIG", default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Override the bookkeeping table prefix from the config
    #[arg(long, env = "SQLMIG_TABLE_PREFIX")]
    table_prefix: Option<String>,

    /// Override the dialect from the config
    #[arg(long, env = "SQLMIG_DIALECT")]
    dialect: Option<String>,

    /// Roll every source back after migrating and check each one reverts what it applied
    #[arg(long)]
    roundtrip: bool,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = read_config(&args.config).await?.unwrap_or_default();
    if let Some(prefix) = args.table_prefix {
        config.table_prefix = prefix;
    }
    if let Some(dialect) = args.dialect {
        config.dialect = dialect;
    }

    info!(
        prefix = %config.table_prefix,
        dialect = %config.dialect,
        sources = args.dirs.len(),
        "Checking migrations"
    );

    let orchestrator = Orchestrator::from_config(
        Arc::new(MemoryDatabase::new()),
        Arc::new(MemoryEngine::new()),
        &config,
    );
    orchestrator
        .register_sources(
            args.dirs
                .into_iter()
                .map(|dir| Arc::new(DirSource::new(dir)) as Arc<dyn MigrationSource>),
        )
        .await;

    let migrated = orchestrator.migrate().await;
    let mut ok = report("migrate", &migrated);

    if args.roundtrip {
        let rolled_back = orchestrator.rollback().await;
        ok &= report("rollback", &rolled_back);

        for name in orchestrator.source_names().await {
            let table = namespace_for(orchestrator.table_prefix(), &name);
            let left = orchestrator.database().applied_ids(&table).await;
            if !left.is_empty() {
                warn!(
                    source = %name,
                    %table,
                    remaining = ?left,
                    "Rollback left units recorded as applied"
                );
                ok = false;
            }
        }
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn report(step: &str, results: &ResultSet) -> bool {
    match results.combined_err() {
        None => {
            info!(step, results = %results, "OK");
            true
        }
        Some(e) => {
            for failure in e.failures() {
                error!(step, source = %failure.source, error = %failure.error, "Source failed");
            }
            error!(step, results = %results, "Failed");
            false
        }
    }
}
