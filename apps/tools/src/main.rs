use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use storage::{EntityKind, Record, Storage};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "data/fixture.json")]
    fixture: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write an empty dataset.
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Load the dataset and verify the session index.
    Check,
    List {
        collection: Collection,
    },
    /// Create or update one record from a JSON object.
    Upsert {
        collection: Collection,
        record: String,
    },
    Delete {
        collection: Collection,
        id: i64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Collection {
    Sessions,
    Positions,
    Applicants,
    Assignments,
    ContractTemplates,
}

impl From<Collection> for EntityKind {
    fn from(collection: Collection) -> Self {
        match collection {
            Collection::Sessions => EntityKind::Session,
            Collection::Positions => EntityKind::Position,
            Collection::Applicants => EntityKind::Applicant,
            Collection::Assignments => EntityKind::Assignment,
            Collection::ContractTemplates => EntityKind::ContractTemplate,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = execute(&cli.fixture, cli.command)?;
    println!("{output}");
    Ok(())
}

fn open(path: &Path) -> Result<Storage> {
    if path.exists() {
        Storage::load_fixture(path)
    } else {
        Ok(Storage::new())
    }
}

fn parse_record(raw: &str) -> Result<Record> {
    match serde_json::from_str(raw).context("record is not valid JSON")? {
        Value::Object(record) => Ok(record),
        _ => bail!("record must be a JSON object"),
    }
}

fn execute(path: &Path, command: Command) -> Result<String> {
    match command {
        Command::Init { force } => {
            if path.exists() && !force {
                bail!("'{}' already exists; pass --force to overwrite", path.display());
            }
            Storage::new().save_fixture(path)?;
            Ok(format!("initialized {}", path.display()))
        }
        Command::Check => {
            let storage = Storage::load_fixture(path)?;
            storage.check_integrity()?;
            let counts: Vec<String> = EntityKind::ALL
                .iter()
                .map(|kind| {
                    format!(
                        "{}={}",
                        kind.collection_name(),
                        storage.find_all(*kind).len()
                    )
                })
                .collect();
            Ok(format!("ok {}", counts.join(" ")))
        }
        Command::List { collection } => {
            let storage = open(path)?;
            Ok(serde_json::to_string_pretty(
                &storage.find_all(collection.into()),
            )?)
        }
        Command::Upsert { collection, record } => {
            let storage = open(path)?;
            let saved = storage.upsert(collection.into(), parse_record(&record)?)?;
            storage.save_fixture(path)?;
            Ok(serde_json::to_string_pretty(&saved)?)
        }
        Command::Delete { collection, id } => {
            let storage = open(path)?;
            let mut target = Record::new();
            target.insert("id".into(), id.into());
            let deleted = storage.delete(collection.into(), &target)?;
            storage.save_fixture(path)?;
            Ok(serde_json::to_string_pretty(&deleted)?)
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
