//! Nerkh dashboard entry point

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use nerkh_core::logging::init_tracing;
use nerkh_core::{NerkhConfig, SortConfig};
use nerkh_dashboard::render::{render_dashboard, render_notification};
use nerkh_dashboard::{
    commands, AppState, Command, NotificationLevel, RefreshController, RefreshOutcome, ViewMode,
};
use nerkh_price_feed::{CachePolicy, PriceAggregator, RefreshScheduler};

#[derive(Parser, Debug)]
#[command(name = "nerkh", version, about = "Currency, gold and crypto prices in Toman")]
struct Args {
    /// Config file (defaults to ./nerkh.toml when present)
    #[arg(short, long, env = "NERKH_CONFIG")]
    config: Option<PathBuf>,

    /// Print one screen and exit
    #[arg(long)]
    once: bool,

    /// Skip the 30 minute cache on the first load
    #[arg(long)]
    force: bool,

    /// grid or list
    #[arg(long, default_value = "grid")]
    view: ViewMode,

    /// Sort column, e.g. `price:desc`
    #[arg(long)]
    sort: Option<SortConfig>,
}

fn print_screen(controller: &RefreshController) {
    let mut state = controller.state().write();
    println!("{}", render_dashboard(&state));
    if let Some(note) = state.take_notification() {
        println!("{}", render_notification(note.level, &note.message));
    }
}

fn apply_command(controller: &RefreshController, command: Command) {
    let mut state = controller.state().write();
    match command {
        Command::ToggleView => {
            state.toggle_view();
        }
        Command::Sort(key) => {
            state.toggle_sort(key);
        }
        Command::AddAlert(request) => match state.add_alert(&request) {
            Ok(id) => info!("Alert {} added", id),
            Err(e) => println!("{}", render_notification(NotificationLevel::Error, &e.to_string())),
        },
        Command::DeleteAlert(prefix) => {
            let found = state
                .alerts
                .iter()
                .find(|a| a.id.to_string().starts_with(&prefix))
                .map(|a| a.id);
            if !found.is_some_and(|id| state.remove_alert(id)) {
                println!("{}", render_notification(NotificationLevel::Error, "No such alert"));
            }
        }
        Command::Refresh | Command::Help | Command::Quit => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = NerkhConfig::load(args.config.as_deref())?;
    init_tracing(&config.logging);
    info!("Starting Nerkh dashboard v{}", env!("CARGO_PKG_VERSION"));

    let aggregator = PriceAggregator::from_config(&config)?;
    let controller = Arc::new(RefreshController::new(
        Arc::new(aggregator),
        CachePolicy::new(config.fetch.cache_window()),
        AppState::new(args.view, args.sort),
    ));

    let outcome = controller.refresh(args.force).await;
    print_screen(&controller);

    if args.once {
        if let RefreshOutcome::Failed { error, .. } = outcome {
            return Err(error.into());
        }
        return Ok(());
    }

    let mut scheduler = {
        let controller = Arc::clone(&controller);
        RefreshScheduler::start(config.fetch.refresh_interval(), move || {
            let controller = Arc::clone(&controller);
            async move {
                controller.refresh(false).await;
                print_screen(&controller);
            }
        })
    };

    println!("{}", commands::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        error!("Failed to read stdin: {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match Command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(Command::Help) => println!("{}", commands::HELP),
                    Ok(Command::Refresh) => {
                        controller.refresh(true).await;
                        print_screen(&controller);
                    }
                    Ok(command) => {
                        apply_command(&controller, command);
                        print_screen(&controller);
                    }
                    Err(e) => println!("{}", render_notification(NotificationLevel::Error, &e)),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C");
                break;
            }
        }
    }

    scheduler.cancel();
    info!("Dashboard closed after {} scheduled refreshes", scheduler.tick_count());
    Ok(())
}
