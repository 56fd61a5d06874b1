//! phonebookd - Phonebook session daemon
//!
//! Loads roles, accounts and directory entries from JSON seed files and runs
//! the session core with its background expiry sweep. Requests arrive as
//! text commands on stdin, one per line, and answers go to stdout as JSON.
//!
//! # Usage
//!
//! ```bash
//! PHONEBOOK_ROLES=roles.json PHONEBOOK_ACCOUNTS=accounts.json \
//!   PHONEBOOK_ENTITIES=entities.json phonebookd serve
//!
//! phonebookd roles --roles roles.json
//! phonebookd check --roles roles.json --entities entities.json \
//!   --uid 2 --rid 2 person 3
//! ```

mod console;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use phonebook_core::{EntityKey, EntityKind, JsonRoleSource, PermissionTable, Principal};
use phonebook_session::{
    Counters, Directory, EntityStore, LookupCache, LookupSeed, LookupTables,
    MemoryCredentialStore, MemoryEntityStore, SessionConfig, SessionManager, SessionSweeper,
};

#[derive(Parser)]
#[command(name = "phonebookd")]
#[command(about = "Phonebook session daemon and role administration")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RoleArgs {
    /// Role definitions (JSON array)
    #[arg(long, env = "PHONEBOOK_ROLES")]
    roles: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the session core, reading commands from stdin
    Serve {
        #[command(flatten)]
        roles: RoleArgs,

        /// Accounts with passwords (JSON array)
        #[arg(long, env = "PHONEBOOK_ACCOUNTS")]
        accounts: PathBuf,

        /// Directory entries (JSON array of kind-tagged records)
        #[arg(long, env = "PHONEBOOK_ENTITIES")]
        entities: PathBuf,

        /// Job titles and departments (JSON object)
        #[arg(long, env = "PHONEBOOK_LOOKUPS")]
        lookups: Option<PathBuf>,

        /// Idle seconds before a session expires
        #[arg(long, env = "PHONEBOOK_SESSION_TIMEOUT", default_value_t = 600,
              value_parser = clap::value_parser!(u64).range(1..))]
        session_timeout: u64,

        /// Seconds between expiry sweeps
        #[arg(long, env = "PHONEBOOK_SWEEP_INTERVAL", default_value_t = 300,
              value_parser = clap::value_parser!(u64).range(1..))]
        sweep_interval: u64,
    },
    /// Print the permission table of every role
    Roles {
        #[command(flatten)]
        roles: RoleArgs,

        /// Print raw JSON instead of one line per grant
        #[arg(long, default_value = "false")]
        json: bool,
    },
    /// Show one entity as a given principal would see it
    Check {
        #[command(flatten)]
        roles: RoleArgs,

        #[arg(long, env = "PHONEBOOK_ENTITIES")]
        entities: PathBuf,

        /// Acting uid
        #[arg(long)]
        uid: i64,

        /// Acting role id
        #[arg(long)]
        rid: i64,

        /// person, company or class
        kind: EntityKind,

        key: i64,
    },
}

fn load_permissions(path: &Path) -> anyhow::Result<PermissionTable> {
    PermissionTable::load(&JsonRoleSource::new(path))
        .with_context(|| format!("loading roles from {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("phonebook_session=info".parse()?)
                .add_directive("phonebookd=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            roles,
            accounts,
            entities,
            lookups,
            session_timeout,
            sweep_interval,
        } => {
            let config = SessionConfig::default()
                .with_timeout(Duration::from_secs(session_timeout))
                .with_sweep_interval(Duration::from_secs(sweep_interval));
            serve(&roles.roles, &accounts, &entities, lookups.as_deref(), config).await?;
        }
        Commands::Roles { roles, json } => {
            let table = load_permissions(&roles.roles)?;
            if json {
                println!("{}", serde_json::to_string_pretty(table.roles())?);
            } else {
                for role in table.roles() {
                    println!("{} {} ({})", role.rid, role.name, role.descr);
                    for fp in &role.perms {
                        println!("    {:<8} {:<28} {:?}", fp.elem.as_str(), fp.field, fp.perm);
                    }
                }
            }
        }
        Commands::Check {
            roles,
            entities,
            uid,
            rid,
            kind,
            key,
        } => {
            let table = load_permissions(&roles.roles)?;
            if table.role(rid).is_none() {
                anyhow::bail!("role {rid} is not defined");
            }
            let store = MemoryEntityStore::load(&entities)?;
            let record = store
                .fetch(&EntityKey::new(kind, key))?
                .with_context(|| format!("{kind} {key} not found"))?;
            let filtered = table.filter_record(record, &Principal::new(uid, rid));
            println!("{}", serde_json::to_string_pretty(&filtered)?);
        }
    }

    Ok(())
}

async fn serve(
    roles: &Path,
    accounts: &Path,
    entities: &Path,
    lookups: Option<&Path>,
    config: SessionConfig,
) -> anyhow::Result<()> {
    let permissions = Arc::new(load_permissions(roles)?);
    let credentials = Arc::new(MemoryCredentialStore::load(accounts)?);
    let store = Arc::new(MemoryEntityStore::load(entities)?);
    let seed = match lookups {
        Some(path) => LookupSeed::load(path)
            .with_context(|| format!("loading lookups from {}", path.display()))?,
        None => LookupSeed::default(),
    };
    let tables = LookupTables::build(store.as_ref(), seed)?;

    let sessions = SessionManager::new(credentials, permissions, config);
    let sweeper = SessionSweeper::spawn(sessions.clone());
    let directory = Directory::new(sessions, store, LookupCache::new(tables), Counters::new());

    tracing::info!(
        timeout_secs = config.timeout.as_secs(),
        sweep_secs = config.sweep_interval.as_secs(),
        "phonebookd ready"
    );

    let mut shutdown = directory.shutdown_signal();
    tokio::select! {
        res = console::run(directory.clone()) => {
            if let Err(e) = res {
                tracing::error!(error = %e, "console failed");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received");
        }
        _ = shutdown.wait_for(|stop| *stop) => {
            tracing::info!("shutdown executed");
        }
    }

    sweeper.shutdown().await;
    let counters = serde_json::to_string(&directory.counters().snapshot().await?)?;
    tracing::info!(%counters, "phonebookd stopped");
    Ok(())
}
