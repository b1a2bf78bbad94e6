use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use foodprint_core::{create_engine, EngineSettings, QueryClient};

#[derive(Parser)]
#[command(name = "foodprint")]
#[command(about = "Foodprint CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tables of the configured database
    Tables,
    /// Run a SQL statement and print the rows as JSON
    Query {
        /// SQL text, run as-is
        sql: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = connect().await?;

    match cli.command {
        Commands::Tables => {
            list_tables(&client).await?;
        }
        Commands::Query { sql } => {
            run_query(&client, &sql).await?;
        }
    }

    Ok(())
}

async fn connect() -> Result<QueryClient> {
    let settings = EngineSettings::from_env().context("Invalid engine configuration")?;
    let engine = create_engine(settings.kind).await;
    tracing::debug!(
        engine = engine.engine_name(),
        database = %settings.context.database,
        "connected"
    );

    Ok(QueryClient::new(
        Arc::from(engine),
        settings.context,
        settings.poll,
    ))
}

async fn list_tables(client: &QueryClient) -> Result<()> {
    let database = client.context().database.clone();
    println!("Connecting to database: {}", database);

    // SHOW TABLES has no header row; each row holds one table name
    let rows = client
        .execute_rows(&format!("SHOW TABLES IN {}", database))
        .await
        .context("Failed to list tables")?;

    println!("\n=== Available Tables ===");
    let names = rows
        .iter()
        .filter_map(|row| row.first().cloned().flatten());
    let mut total = 0;
    for (index, name) in names.enumerate() {
        println!("{}. {}", index + 1, name);
        total += 1;
    }
    println!("\nTotal tables found: {}", total);

    Ok(())
}

async fn run_query(client: &QueryClient, sql: &str) -> Result<()> {
    let result = client.execute(sql).await.context("Query failed")?;
    println!("{}", serde_json::to_string_pretty(result.rows())?);
    eprintln!("{} row(s)", result.len());
    Ok(())
}
