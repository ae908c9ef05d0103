use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use order_view_engine::{
    config::{self, EngineConfig},
    derive_order_view, derive_production_view,
    models::{FilterConfig, Order, ProductionFilterConfig, ProductionItem, ViewConfig, ViewFilters, ViewName},
    storage::ViewStateFactory,
    OrderRow, ProductionRow, ViewConfigStore,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "view-cli", about = "Derive dashboard views from record snapshots")]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter, roll up and sort an orders snapshot
    Orders(DeriveArgs),
    /// Filter and sort a production items snapshot
    Production(DeriveArgs),
    /// Inspect or edit a persisted view configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args)]
struct DeriveArgs {
    /// JSON array of records
    #[arg(long)]
    records: PathBuf,
    /// Persisted view configuration document; the configured store is used when omitted
    #[arg(long)]
    view_config: Option<PathBuf>,
    /// Free-text search applied on top of the filters
    #[arg(long)]
    search: Option<String>,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the stored configuration of a view
    Show {
        #[arg(long, value_enum)]
        view: ViewArg,
    },
    /// Move one fabrication priority entry and save immediately
    Reorder {
        #[arg(long, value_enum)]
        view: ViewArg,
        #[arg(long)]
        from: usize,
        #[arg(long)]
        to: usize,
    },
    /// Restore a view's defaults and save immediately
    Reset {
        #[arg(long, value_enum)]
        view: ViewArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ViewArg {
    Pedidos,
    Produccion,
}

impl From<ViewArg> for ViewName {
    fn from(arg: ViewArg) -> Self {
        match arg {
            ViewArg::Pedidos => ViewName::Pedidos,
            ViewArg::Produccion => ViewName::Produccion,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let engine_config = config::load_config().context("failed to load engine config")?;
    config::init_tracing(engine_config.log_level(), engine_config.log_json);

    match cli.command {
        Commands::Orders(args) => handle_orders(&engine_config, args, cli.json).await?,
        Commands::Production(args) => handle_production(&engine_config, args, cli.json).await?,
        Commands::Config(command) => handle_config_command(&engine_config, command, cli.json).await?,
    }

    Ok(())
}

async fn handle_orders(engine_config: &EngineConfig, args: DeriveArgs, json: bool) -> Result<()> {
    let orders: Vec<Order> = read_json(&args.records)?;
    let mut view_config: ViewConfig<FilterConfig> =
        resolve_view_config(engine_config, ViewName::Pedidos, args.view_config.as_ref()).await?;
    if let Some(search) = args.search {
        view_config.search_query = search;
    }

    let view = derive_order_view(&orders, &view_config);
    if json {
        return print_json(&view);
    }

    println!("{} of {} orders", view.visible_records, view.total_records);
    for row in &view.rows {
        render_order_row(row);
    }
    Ok(())
}

async fn handle_production(engine_config: &EngineConfig, args: DeriveArgs, json: bool) -> Result<()> {
    let items: Vec<ProductionItem> = read_json(&args.records)?;
    let mut view_config: ViewConfig<ProductionFilterConfig> =
        resolve_view_config(engine_config, ViewName::Produccion, args.view_config.as_ref()).await?;
    if let Some(search) = args.search {
        view_config.search_query = search;
    }

    let view = derive_production_view(&items, &view_config);
    if json {
        return print_json(&view);
    }

    println!("{} of {} items", view.visible_records, view.total_records);
    for row in &view.rows {
        render_production_row(row);
    }
    Ok(())
}

async fn handle_config_command(
    engine_config: &EngineConfig,
    command: ConfigCommands,
    json: bool,
) -> Result<()> {
    match command {
        ConfigCommands::Show { view } => match ViewName::from(view) {
            ViewName::Pedidos => show_config::<FilterConfig>(engine_config, ViewName::Pedidos, json).await,
            ViewName::Produccion => {
                show_config::<ProductionFilterConfig>(engine_config, ViewName::Produccion, json).await
            }
        },
        ConfigCommands::Reorder { view, from, to } => {
            let view = ViewName::from(view);
            match view {
                ViewName::Pedidos => reorder::<FilterConfig>(engine_config, view, from, to).await,
                ViewName::Produccion => {
                    reorder::<ProductionFilterConfig>(engine_config, view, from, to).await
                }
            }
        }
        ConfigCommands::Reset { view } => {
            let view = ViewName::from(view);
            match view {
                ViewName::Pedidos => reset::<FilterConfig>(engine_config, view).await,
                ViewName::Produccion => reset::<ProductionFilterConfig>(engine_config, view).await,
            }
        }
    }
}

async fn open_store<F: ViewFilters>(engine_config: &EngineConfig, view: ViewName) -> ViewConfigStore<F> {
    let store = ViewConfigStore::new(view, ViewStateFactory::create(engine_config), engine_config);
    store.hydrate().await;
    store
}

async fn show_config<F: ViewFilters>(engine_config: &EngineConfig, view: ViewName, json: bool) -> Result<()> {
    let store = open_store::<F>(engine_config, view).await;
    let persisted = store
        .snapshot()
        .to_persisted()
        .context("failed to serialize view configuration")?;
    if json {
        return print_json(&persisted);
    }
    println!("view {} ({})", view, store.storage_key());
    for criterion in store.sort().effective_criteria() {
        println!("- sort {} {:?}", criterion.field, criterion.dir);
    }
    print_priority(store.sort().fabrication_priority.members());
    Ok(())
}

async fn reorder<F: ViewFilters>(engine_config: &EngineConfig, view: ViewName, from: usize, to: usize) -> Result<()> {
    let store = open_store::<F>(engine_config, view).await;
    store
        .reorder_priority(from, to)
        .with_context(|| format!("cannot reorder {} priority", view))?;
    store.flush().await.context("failed to save view configuration")?;
    print_priority(store.sort().fabrication_priority.members());
    Ok(())
}

async fn reset<F: ViewFilters>(engine_config: &EngineConfig, view: ViewName) -> Result<()> {
    let store = open_store::<F>(engine_config, view).await;
    store.reset();
    store.flush().await.context("failed to save view configuration")?;
    println!("view {} reset to defaults", view);
    Ok(())
}

async fn resolve_view_config<F: ViewFilters>(
    engine_config: &EngineConfig,
    view: ViewName,
    path: Option<&PathBuf>,
) -> Result<ViewConfig<F>> {
    match path {
        Some(path) => {
            let document: serde_json::Value = read_json(path)?;
            let (config, fallbacks) = ViewConfig::<F>::from_persisted(&document);
            if !fallbacks.is_empty() {
                warn!(fields = ?fallbacks, "view configuration partially invalid; using defaults for these fields");
            }
            Ok(config)
        }
        None => {
            debug!(view = %view, "using stored view configuration");
            Ok(open_store::<F>(engine_config, view).await.snapshot())
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_priority<S: std::fmt::Display>(members: &[S]) {
    let labels: Vec<String> = members.iter().map(ToString::to_string).collect();
    println!("fabrication priority: {}", labels.join(" > "));
}

fn render_order_row(row: &OrderRow) {
    let summary = &row.summary;
    println!(
        "- {} • {} • {} item(s) • {}{} • total {} • rest {}",
        row.order.order_date,
        row.order.customer.name,
        summary.item_count,
        summary.dominant_state,
        if summary.has_priority_item { " • priority" } else { "" },
        summary.total_value,
        summary.rest_paid_amount_order
    );
}

fn render_production_row(row: &ProductionRow) {
    let item = &row.item;
    println!(
        "- {} • {} • {} ({}) • aspire {}",
        item.created_on,
        item.design_name,
        item.production_state,
        row.fabrication_state,
        item.aspire_state.as_deref().unwrap_or("-")
    );
}
