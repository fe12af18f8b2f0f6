//! `folk` — command-line front end for the Folk identity store.
//!
//! Reads `folk.toml` (or the path given with `--config`), opens the local
//! SQLite mapping, and exposes the merge/unmerge/inspection operations:
//!
//! ```
//! folk persons
//! folk merge a@example.com xmpp:al@jabber.org
//! folk unmerge folk://3
//! folk duplicates --contacts contacts.json
//! ```

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use folk_core::{
  matcher::Match,
  notify::ChangeBus,
  record::{ContactId, ContactRecord},
  store::IdentityStore,
};
use folk_engine::Aggregator;
use folk_store_sqlite::SqliteStore;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "folk", version, about = "Persons aggregation for merged contact sources")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "folk.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// List every person and its member contact ids.
  Persons,

  /// Merge two or more contact ids and/or `folk://` person uris.
  Merge {
    #[arg(required = true, num_args = 2..)]
    ids: Vec<String>,
  },

  /// Detach a contact id, or dissolve a whole `folk://` person.
  Unmerge { id: String },

  /// Propose duplicate merges over a contact set.
  Duplicates {
    /// JSON file mapping contact id to contact record.
    #[arg(long)]
    contacts: PathBuf,

    /// Restrict the scan to matches involving this person key.
    #[arg(long = "for", value_name = "KEY")]
    target: Option<String>,
  },
}

// ─── Config ──────────────────────────────────────────────────────────────────

/// Shape of the TOML config file; every key has a sensible default so the
/// file itself is optional.
#[derive(Debug, Clone, Deserialize)]
struct FolkConfig {
  #[serde(default = "default_store_path")]
  store_path: PathBuf,
}

fn default_store_path() -> PathBuf { PathBuf::from("folk.db") }

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("FOLK"))
    .build()
    .context("failed to read configuration")?;

  let folk_cfg: FolkConfig = settings
    .try_deserialize()
    .context("failed to deserialise configuration")?;

  let store_path = expand_tilde(&folk_cfg.store_path);
  let store = SqliteStore::open(&store_path, ChangeBus::default())
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  tracing::debug!(path = %store_path.display(), "identity store open");

  match cli.command {
    Command::Persons => persons(&store).await,
    Command::Merge { ids } => merge(&store, &ids).await,
    Command::Unmerge { id } => unmerge(&store, &id).await,
    Command::Duplicates { contacts, target } => {
      duplicates(store, &contacts, target.as_deref()).await
    }
  }
}

// ─── Commands ────────────────────────────────────────────────────────────────

async fn persons(store: &SqliteStore) -> anyhow::Result<()> {
  let mapping = store.all_persons().await.context("listing persons")?;

  let mut persons: Vec<_> = mapping.into_iter().collect();
  persons.sort_by_key(|(person_id, _)| *person_id);

  if persons.is_empty() {
    println!("no merged persons");
    return Ok(());
  }

  for (person_id, mut contacts) in persons {
    contacts.sort();
    println!("{person_id}");
    for contact in contacts {
      println!("  {contact}");
    }
  }
  Ok(())
}

async fn merge(store: &SqliteStore, ids: &[String]) -> anyhow::Result<()> {
  match store.merge_contacts(ids).await.context("merging")? {
    Some(person) => println!("{person}"),
    None => anyhow::bail!("merging requires at least two distinct parties"),
  }
  Ok(())
}

async fn unmerge(store: &SqliteStore, id: &str) -> anyhow::Result<()> {
  let deleted = store.unmerge_contact(id).await.context("unmerging")?;
  if deleted {
    println!("unmerged {id}");
  } else {
    println!("{id} had no mapping; nothing to do");
  }
  Ok(())
}

async fn duplicates(
  store: SqliteStore,
  contacts_path: &Path,
  target: Option<&str>,
) -> anyhow::Result<()> {
  let raw = std::fs::read_to_string(contacts_path)
    .with_context(|| format!("reading {contacts_path:?}"))?;
  let value: serde_json::Value =
    serde_json::from_str(&raw).context("parsing contact set")?;
  let serde_json::Value::Object(entries) = value else {
    anyhow::bail!("contact set must be a JSON object keyed by contact id");
  };

  let mut contacts: HashMap<ContactId, ContactRecord> = HashMap::new();
  for (id, record) in entries {
    let record = ContactRecord::from_json(record)
      .with_context(|| format!("invalid record for contact {id:?}"))?;
    contacts.insert(ContactId::new(id), record);
  }

  let mut engine = Aggregator::new(store);
  engine
    .seed_contacts(contacts)
    .await
    .context("grouping contacts")?;

  let matches = match target {
    Some(key) => engine.find_matches_for(key),
    None => engine.find_all_matches(),
  };

  if matches.is_empty() {
    println!("no duplicate candidates");
    return Ok(());
  }

  for m in &matches {
    print_match(&engine, m);
  }
  println!("{} candidate pair(s)", matches.len());
  Ok(())
}

fn print_match(engine: &Aggregator<SqliteStore>, m: &Match<String>) {
  let fields: Vec<String> = m
    .fields
    .iter()
    .map(|f| format!("{f:?}").to_lowercase())
    .collect();
  println!(
    "{} <-> {}  on [{}]",
    describe(engine, &m.first),
    describe(engine, &m.second),
    fields.join(", "),
  );
}

fn describe(engine: &Aggregator<SqliteStore>, key: &str) -> String {
  match engine.person(key).and_then(|a| {
    a.composite().display_name().map(str::to_owned)
  }) {
    Some(name) => format!("{key} ({name})"),
    None => key.to_owned(),
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
