use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use salesforce_orm::config::login_url_from_env;
use salesforce_orm::{Credentials, ModelsFile, Orm, OrmConfig, Record, SoapTransport};

#[derive(Parser)]
#[command(name = "salesforce-orm", version, about = "Query and fetch Salesforce records over the SOAP API")]
struct Cli {
    /// TOML file declaring models ([[model]] name = "...", fields = [...])
    #[arg(long, global = true, default_value = "models.toml")]
    models: PathBuf,

    /// Print single-line JSON
    #[arg(long, global = true)]
    compact: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a raw SOQL statement and print the raw result
    Query {
        statement: String,
    },
    /// Search records of a model with a SOQL where clause
    Search {
        model: String,
        #[arg(value_name = "WHERE")]
        where_clause: String,
        /// Extra field to select (repeatable)
        #[arg(long = "field", value_name = "FIELD")]
        fields: Vec<String>,
    },
    /// Fetch one record of a model by Id
    Get {
        model: String,
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut builder = OrmConfig::builder();
    if let Some(url) = login_url_from_env() {
        builder = builder.login_url(url);
    }
    let config = builder.build().context("Invalid ORM configuration")?;

    let credentials = Credentials::from_env()?;
    let transport = SoapTransport::new(credentials, &config);
    let orm = Orm::with_config(Arc::new(transport), &config);

    register_models(&orm, &cli.models, cli.verbose)?;

    match cli.command {
        Commands::Query { statement } => {
            let raw = orm.query(&statement).await.context("Failed to run query")?;
            let result = raw.into_result().context("Query failed")?;
            print_json(&result, cli.compact)?;
        }
        Commands::Search {
            model,
            where_clause,
            fields,
        } => {
            let records = orm
                .search(&model, &where_clause, &fields)
                .await
                .with_context(|| format!("Failed to search {}", model))?;

            if cli.verbose {
                eprintln!("Found {} {} records", records.len().to_string().cyan(), model.bold());
            }
            let values: Vec<_> = records.iter().map(Record::to_value).collect();
            print_json(&serde_json::Value::Array(values), cli.compact)?;
        }
        Commands::Get { model, id } => {
            let mut record = orm.new_record(&model)?;
            record.set_field("Id", id.as_str());
            record
                .get()
                .await
                .with_context(|| format!("Failed to fetch {} {}", model, id))?;
            print_json(&record.to_value(), cli.compact)?;
        }
    }

    Ok(())
}

/// Register every model declared in the model file
fn register_models(orm: &Orm, path: &Path, verbose: bool) -> Result<()> {
    if !path.exists() {
        log::warn!("Model file {} not found, no models registered", path.display());
        return Ok(());
    }

    let file = ModelsFile::load(path)?;
    for model in file.models {
        let name = model.name.clone();
        if !orm.add_model(model) {
            log::warn!("Model '{}' is declared more than once, keeping the first", name);
        }
    }

    if verbose {
        eprintln!(
            "Loaded models from {}: {}",
            path.display().to_string().cyan(),
            orm.registry().names().join(", ").bright_green()
        );
    }
    Ok(())
}

fn print_json(value: &serde_json::Value, compact: bool) -> Result<()> {
    let output = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
    .context("Failed to format JSON output")?;

    println!("{}", output);
    Ok(())
}
