use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use instrument_api::{
    InstrumentId, InstrumentPatch, InstrumentStore, InstrumentType, NewInstrument,
    query::{QueryParams, SortDirection, SortField},
    store::{http::HttpStore, memory::InMemoryStore},
};
use instrument_sync::{
    InstrumentSession,
    config::{ClientConfig, load_config_path, load_default},
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Instrument client CLI")]
struct Cli {
    /// Client config TOML; built-in defaults when omitted.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    /// Use an in-memory store seeded with demo instruments instead of the API.
    #[arg(long, global = true)]
    memory: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Search, filter, sort and page the instrument list.
    List(ListArgs),
    Get {
        id: i64,
    },
    Create(CreateArgs),
    Update(UpdateArgs),
    Delete {
        id: i64,
    },
}

#[derive(Args)]
struct ListArgs {
    #[arg(long, short)]
    query: Option<String>,
    #[arg(long = "type", value_parser = parse_type)]
    instrument_type: Option<InstrumentType>,
    #[arg(long)]
    sector: Option<String>,
    #[arg(long)]
    country: Option<String>,
    #[arg(long, default_value_t = 0)]
    page: usize,
    #[arg(long)]
    page_size: Option<usize>,
    #[arg(long, value_enum, default_value_t = SortArg::FullName)]
    sort: SortArg,
    #[arg(long)]
    desc: bool,
}

#[derive(Args)]
struct CreateArgs {
    #[arg(long)]
    short_name: String,
    #[arg(long)]
    full_name: String,
    #[arg(long = "type", value_parser = parse_type)]
    instrument_type: InstrumentType,
    #[arg(long)]
    original_currency: String,
    #[arg(long)]
    interest_currency: String,
    #[arg(long)]
    isin: Option<String>,
    #[arg(long)]
    sector: Option<String>,
    #[arg(long)]
    country: Option<String>,
}

#[derive(Args)]
struct UpdateArgs {
    id: i64,
    #[arg(long)]
    short_name: Option<String>,
    #[arg(long)]
    full_name: Option<String>,
    #[arg(long)]
    isin: Option<String>,
    #[arg(long)]
    sector: Option<String>,
    #[arg(long)]
    country: Option<String>,
    #[arg(long)]
    last_price: Option<f64>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum SortArg {
    Id,
    ShortName,
    FullName,
    Type,
    Sector,
    Country,
    LastPrice,
    UpdatedAt,
}

impl From<SortArg> for SortField {
    fn from(s: SortArg) -> Self {
        match s {
            SortArg::Id => SortField::Id,
            SortArg::ShortName => SortField::ShortName,
            SortArg::FullName => SortField::FullName,
            SortArg::Type => SortField::InstrumentType,
            SortArg::Sector => SortField::Sector,
            SortArg::Country => SortField::Country,
            SortArg::LastPrice => SortField::LastPrice,
            SortArg::UpdatedAt => SortField::UpdatedAt,
        }
    }
}

fn parse_type(s: &str) -> Result<InstrumentType, String> {
    s.parse().map_err(|e: instrument_api::models::enums::UnknownInstrumentType| e.to_string())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // 1) Config
    let config: ClientConfig = match &cli.config {
        Some(path) => load_config_path(path)?,
        None => load_default()?,
    };

    // 2) Store
    let store: Arc<dyn InstrumentStore> = if cli.memory {
        Arc::new(InMemoryStore::with_demo_data())
    } else {
        Arc::new(HttpStore::new(config.http_store_options()).context("failed to set up the instruments API client")?)
    };
    let session = InstrumentSession::from_config(store, &config);

    // 3) Command
    match cli.cmd {
        Cmd::List(args) => {
            let params = QueryParams {
                query: args.query,
                instrument_type: args.instrument_type,
                sector: args.sector,
                country: args.country,
                sort_field: args.sort.into(),
                sort_direction: if args.desc { SortDirection::Desc } else { SortDirection::Asc },
                page: args.page,
                page_size: args.page_size.unwrap_or(config.default_page_size),
            };
            let view = session.list(params).await.map_err(user_error)?;
            print_json(&view)?;
        }
        Cmd::Get { id } => {
            let found = session.get(InstrumentId(id)).await.map_err(user_error)?;
            print_json(&found)?;
        }
        Cmd::Create(args) => {
            let mut dto = NewInstrument::new(
                args.short_name,
                args.full_name,
                args.instrument_type,
                args.original_currency,
                args.interest_currency,
            );
            dto.isin = args.isin;
            dto.sector = args.sector;
            dto.country = args.country;
            let created = session.create(&dto).await.map_err(user_error)?;
            print_json(&created)?;
        }
        Cmd::Update(args) => {
            let patch = InstrumentPatch {
                short_name: args.short_name,
                full_name: args.full_name,
                isin: args.isin,
                sector: args.sector,
                country: args.country,
                last_price: args.last_price,
                ..Default::default()
            };
            let updated = session.update(InstrumentId(args.id), &patch).await.map_err(user_error)?;
            print_json(&updated)?;
        }
        Cmd::Delete { id } => {
            session.delete(InstrumentId(id)).await.map_err(user_error)?;
            print_json(&serde_json::json!({ "deleted": id }))?;
        }
    }

    Ok(())
}

fn user_error(err: instrument_api::StoreError) -> anyhow::Error {
    tracing::debug!(error = %err, "command failed");
    anyhow::anyhow!(err.user_message())
}
