//! llmprice - Track LLM price changes and query published pricing

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use llmprice::{
    cli::{Cli, Command},
    output::{OutputFormatter, get_formatter, to_pretty_json},
};
use llmprice_changelog::{
    ChangeLogStore, JsonFileBackend, previous_provider_snapshot, provider_snapshot,
};
use llmprice_core::{LlmPriceError, StaticPriceSource};
use llmprice_pricing::{
    DualDateFile, FileCache, HttpFetcher, PricingClient, PricingClientConfig, TokenUsage,
    config::read_custom_providers,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pricing client options from global flags
async fn build_config(cli: &Cli) -> Result<PricingClientConfig> {
    let mut config = PricingClientConfig::new()
        .offline(cli.offline)
        .time_offset_ms(cli.time_offset_ms);

    if let Some(path) = &cli.custom {
        let custom = read_custom_providers(path).await?;
        info!("Loaded custom prices for {} provider(s)", custom.len());
        config = config.custom_providers(custom);
    }

    if !cli.no_cache && !cli.offline {
        let cache = match &cli.cache_dir {
            Some(dir) => FileCache::new(dir),
            None => FileCache::in_default_dir()?,
        };
        debug!("Using pricing cache in {}", cache.dir().display());
        config = config.external_cache(Arc::new(cache));
    }

    Ok(config)
}

/// Build the pricing client from global options
async fn build_client(cli: &Cli) -> Result<PricingClient> {
    let config = build_config(cli).await?;

    let base_url = match (&cli.base_url, cli.offline) {
        (Some(url), _) => url.clone(),
        // Offline clients never reach the fetcher.
        (None, true) => String::new(),
        (None, false) => bail!(
            "No pricing base URL configured; pass --base-url or set LLMPRICE_BASE_URL (or use --offline)"
        ),
    };
    let fetcher = HttpFetcher::with_timeout(base_url, Duration::from_secs(cli.timeout))?;

    let client = PricingClient::new(config, Arc::new(fetcher));
    client
        .today()
        .context("Invalid --time-offset-ms / LLMPRICE_TIME_OFFSET_MS")?;
    Ok(client)
}

fn build_store(cli: &Cli) -> Result<ChangeLogStore<JsonFileBackend>> {
    let dir = cli.resolve_history_dir()?;
    debug!("Using history directory {}", dir.display());
    Ok(ChangeLogStore::new(JsonFileBackend::new(dir)))
}

async fn run(cli: &Cli, formatter: &dyn OutputFormatter) -> Result<()> {
    match &cli.command {
        Command::Apply {
            provider,
            prices,
            source_url,
            at,
        } => {
            info!("Applying observed prices for {}", provider);
            let store = build_store(cli)?;
            let source = StaticPriceSource::from_file(provider, source_url, prices);
            let observed_at = at.unwrap_or_else(Utc::now);

            let events = store
                .crawl(&source, observed_at)
                .await
                .with_context(|| format!("Failed to apply prices for {provider}"))?;
            print!("{}", formatter.format_applied(provider, &events));
        }
        Command::Snapshot { provider, dual } => {
            let store = build_store(cli)?;
            let history = store
                .load(provider)
                .await?
                .ok_or_else(|| LlmPriceError::ProviderNotFound(provider.clone()))?;

            let current = provider_snapshot(&history);
            if *dual {
                let previous = previous_provider_snapshot(&history);
                let file = DualDateFile::from_snapshots(&current, previous.as_ref());
                println!("{}", to_pretty_json(&file));
            } else {
                print!("{}", formatter.format_snapshot(&current));
            }
        }
        Command::History {
            provider,
            model,
            since,
        } => {
            let store = build_store(cli)?;
            let history = store
                .load(provider)
                .await?
                .ok_or_else(|| LlmPriceError::ProviderNotFound(provider.clone()))?;

            let events: Vec<_> = history
                .changes
                .iter()
                .filter(|e| model.as_deref().is_none_or(|m| e.model_id() == m))
                .filter(|e| since.is_none_or(|d| e.date >= d))
                .collect();
            print!("{}", formatter.format_history(provider, &events));
        }
        Command::Providers { stored } => {
            let providers = if *stored {
                build_store(cli)?.backend().list_providers()
            } else {
                build_config(cli).await?.providers()
            };
            print!("{}", formatter.format_providers(&providers));
        }
        Command::Price { provider, model } => {
            let client = build_client(cli).await?;
            let result = client.get_model_pricing(provider, model).await?;
            print!("{}", formatter.format_pricing(&result));
        }
        Command::Models { provider } => {
            let client = build_client(cli).await?;
            let models = client.list_models(provider).await?;
            print!("{}", formatter.format_models(provider, &models));
        }
        Command::Cost {
            provider,
            model,
            input,
            output,
            cached,
        } => {
            let client = build_client(cli).await?;
            let mut usage = TokenUsage::new(*input, *output);
            if let Some(cached) = cached {
                usage = usage.with_cached(*cached);
            }
            let cost = client.calculate_cost(provider, model, usage).await?;
            print!("{}", formatter.format_cost(&cost));
        }
        Command::Raw { provider } => {
            let client = build_client(cli).await?;
            let file = client.get_raw_provider_data(provider).await?;
            println!("{}", to_pretty_json(&file));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The --quiet flag overrides RUST_LOG.
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("warn")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("llmprice=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if cli.no_color || !is_terminal::is_terminal(std::io::stdout()) {
        colored::control::set_override(false);
    }

    let formatter = get_formatter(cli.json);
    if let Err(err) = run(&cli, formatter.as_ref()).await {
        let transport = err
            .downcast_ref::<LlmPriceError>()
            .is_some_and(LlmPriceError::is_transport);
        if transport {
            eprintln!("hint: pricing could not be fetched; retry later or pass --offline with --custom");
        }
        return Err(err);
    }

    Ok(())
}
