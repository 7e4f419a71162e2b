mod render;

use std::process::ExitCode;
use std::time::Duration;

use app_shell::{SelectionController, SelectionState, DEFAULT_SYMBOL};
use clap::Parser;
use data_feed::load_symbol;
use futures_util::StreamExt;
use market_client::{MarketClient, MarketClientConfig, BASE_URL_ENV};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use ts_core::{Field, Granularity};

use crate::render::TextRenderer;

/// Fetch a symbol's series from the chart backend and show what the chart
/// would display for one interval/field selection.
#[derive(Debug, Parser)]
#[command(name = "stockchart", version)]
struct Args {
    /// Ticker to load.
    #[arg(default_value = DEFAULT_SYMBOL)]
    symbol: String,

    /// Backend base URL.
    #[arg(long, env = BASE_URL_ENV, default_value = "http://127.0.0.1:5000")]
    base_url: String,

    /// intraday, daily, weekly, monthly or yearly.
    #[arg(long, default_value = "yearly")]
    interval: Granularity,

    /// all, open_price, high_price, low_price, close_price or volume.
    #[arg(long, default_value = "all")]
    field: Field,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 15)]
    timeout: u64,

    /// Print the widget JSON instead of a summary.
    #[arg(long)]
    json: bool,

    /// Also print the company overview.
    #[arg(long)]
    overview: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Controller starting on the requested selection; nothing is rendered until
/// data arrives.
fn controller_for(args: &Args) -> SelectionController<TextRenderer> {
    SelectionController::new(TextRenderer::new()).with_state(SelectionState {
        granularity: args.interval,
        field: args.field,
    })
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = MarketClientConfig::new(&args.base_url)
        .with_timeout(Duration::from_secs(args.timeout.max(1)));
    let client = MarketClient::new(config)?;

    let mut controller = controller_for(&args);
    let Some(ticket) = controller.select_symbol(&args.symbol)? else {
        return Ok(());
    };

    info!(symbol = %ticket.symbol, "loading series");
    let mut events = load_symbol(&client, ticket, &Granularity::ALL);
    while let Some(event) = events.next().await {
        controller.apply(event);
    }
    let loaded = controller.store().populated();
    info!(granularities = ?loaded, "series loaded");
    // Render at least once even if the selected interval never arrived.
    if !loaded.contains(&args.interval) {
        controller.refresh();
    }

    let renderer = controller.renderer();
    if args.json {
        println!("{}", renderer.to_json()?);
    } else {
        print!("{}", renderer.summary());
    }

    if args.overview {
        let overview = client.company_overview(&args.symbol).await?;
        println!();
        for (id, value) in overview.panel_entries() {
            println!("{id:>14}: {}", value.unwrap_or(""));
        }
    }
    Ok(())
}
