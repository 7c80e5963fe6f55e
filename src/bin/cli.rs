use clap::{Parser, Subcommand};
use kissbot_game_lookup::{
    history, logging, ApiSource, HttpFetchClient, LookupConfig, LookupError, LookupService, Record, SaleInfo,
};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "game-lookup")]
#[command(about = "Steam / SteamDB game lookup", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (KEY=value lines)
    #[arg(short, long, default_value = "config.txt")]
    config: String,

    /// Search history file
    #[arg(long, default_value = "search_history.txt")]
    history: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up one game by title or Steam app id
    Lookup {
        /// Title or app id
        key: String,
    },

    /// Read keys from stdin until "exit"
    Interactive,

    /// Print saved search history
    History,

    /// Price of one app in a country's store (needs STEAM_API_KEY)
    Price {
        app_id: String,

        /// Two-letter country code
        #[arg(long, default_value = "US")]
        country: String,
    },

    /// Current prices of popular games (needs STEAM_API_KEY)
    Sales {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

async fn connect_api(config: &LookupConfig) -> anyhow::Result<ApiSource> {
    let client = Arc::new(HttpFetchClient::new(config.request_timeout(), &config.user_agent)?);
    Ok(ApiSource::connect(config, client).await?)
}

fn print_sale(info: &SaleInfo) {
    let mark = if info.is_highlighted { "🔥" } else { "•" };
    print!("{} {} ({}): {}", mark, info.name, info.app_id, info.current_price);
    if info.is_on_sale {
        print!(" (was {}, -{}%)", info.original_price, info.discount_percent);
    }
    if !info.currency.is_empty() {
        print!(" {}", info.currency);
    }
    println!();
}

fn load_config(path: &str) -> LookupConfig {
    let mut config = match LookupConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("⚠️ Could not read {} ({}), using defaults", path, e);
            LookupConfig::default()
        }
    };

    if let Ok(key) = std::env::var("STEAM_API_KEY") {
        if !key.trim().is_empty() {
            config = config.with_api_key(key.trim());
        }
    }
    config
}

fn print_record(record: &Record) {
    println!("\n✅ {}", record.label());
    print_field("App ID", &record.canonical_id);
    if record.is_free {
        println!("   Price: Free");
    } else {
        print_field("Price", &record.current_price);
        print_field("Original price", &record.original_price);
        print_field("Currency", &record.currency);
        if record.is_on_sale {
            println!("   On sale: -{}%", record.discount_percent);
        }
    }
    print_field("Lowest price", &record.lowest_price);
    print_field("Score", &record.quality_score);
    print_field("Released", &record.release_date);
    print_field("Developer", &record.developer);
    print_field("Publisher", &record.publisher);
    if !record.tags.is_empty() {
        println!("   Tags: {}", record.tags.join(", "));
    }
    print_field("Description", &record.description);
    print_field("URL", &record.url);
    println!("   Source: {}", record.source);
}

fn print_field(label: &str, value: &str) {
    if !value.is_empty() {
        println!("   {}: {}", label, value);
    }
}

fn print_error(key: &str, err: &LookupError) {
    println!("\n❌ Lookup for '{}' failed: {}", key, err);
    if err.is_network() {
        println!("   Please check your internet connection and try again.");
    }
}

async fn interactive(service: &LookupService, history_path: &str) -> anyhow::Result<()> {
    let mut history = history::load_history(history_path)?;
    if !history.is_empty() {
        println!("📋 {} previous searches loaded", history.len());
    }
    println!("Type a game title or app id, or 'exit' to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };
        let key = line.trim();
        if key.is_empty() {
            continue;
        }
        if key.eq_ignore_ascii_case("exit") {
            break;
        }

        history.push(key.to_string());
        match service.lookup_detailed(key).await {
            Ok(response) => {
                print_record(&response.record);
                println!("   Cached: {} ({:.2}ms)", response.from_cache, response.latency_ms);
            }
            Err(e) => print_error(key, &e),
        }
    }

    history::save_history(history_path, &history)?;
    println!("👋 Bye");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing("warn,kissbot_game_lookup=info");

    let cli = Cli::parse();

    match cli.command {
        Commands::Lookup { key } => {
            let service = LookupService::from_config(load_config(&cli.config)).await?;
            println!("🔍 Looking up: {}", key);

            match service.lookup(&key).await {
                Ok(record) => print_record(&record),
                Err(e) => {
                    print_error(&key, &e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Interactive => {
            let service = LookupService::from_config(load_config(&cli.config)).await?;
            interactive(&service, &cli.history).await?;
        }

        Commands::Price { app_id, country } => {
            let api = connect_api(&load_config(&cli.config)).await?;
            match api.price(&app_id, &country).await {
                Ok(info) => print_sale(&info),
                Err(e) => {
                    print_error(&app_id, &e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Sales { limit } => {
            let api = connect_api(&load_config(&cli.config)).await?;
            let sales = api.current_sales(limit).await;
            if sales.is_empty() {
                println!("No price data available");
            }
            for info in &sales {
                print_sale(info);
            }
        }

        Commands::History => {
            let history = history::load_history(&cli.history)?;
            if history.is_empty() {
                println!("No saved searches");
            }
            for (i, key) in history.iter().enumerate() {
                println!("{}. {}", i + 1, key);
            }
        }
    }

    Ok(())
}
