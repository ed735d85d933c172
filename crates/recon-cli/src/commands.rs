use anyhow::Context;
use colored::Colorize;

use recon_cascade::RepairReport;
use recon_server::{AppState, ReconConfig, ReconServer};
use recon_types::{StoreId, VerificationResult};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = ReconConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    tracing::debug!(path = %cli.config.display(), stores = config.stores.len(), "configuration loaded");
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args).await,
        Command::Verify(args) => cmd_verify(config, args, &cli.format).await,
        Command::Repair(args) => cmd_repair(config, args, &cli.format).await,
        Command::CheckConfig => cmd_check_config(config, &cli.format),
    }
}

async fn cmd_serve(mut config: ReconConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind.parse().with_context(|| format!("invalid bind address {bind}"))?;
    }
    println!("{} Recon server on {}", "✓".green().bold(), config.bind_addr.to_string().bold());
    ReconServer::new(config)?.serve().await?;
    Ok(())
}

async fn cmd_verify(config: ReconConfig, args: VerifyArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    let store = StoreId(args.store);
    let supplier = args.supplier.as_deref();
    let result = if args.bl {
        state.verifier.verify_bl(None, store, &args.reference, supplier, true).await
    } else {
        state.verifier.verify_invoice(&args.reference, store, supplier, true).await
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_result(&args.reference, &result),
    }
    Ok(())
}

fn print_result(reference: &str, result: &VerificationResult) {
    if let Some(error) = &result.error_message {
        println!("{} {} could not be verified: {}", "?".yellow().bold(), reference.bold(), error);
    } else if result.exists {
        println!("{} {} found ({})", "✓".green().bold(), reference.bold(), result.match_type.to_string().cyan());
        if let Some(amount) = result.invoice_amount {
            println!("  Amount: {amount:.2}");
        }
        if let Some(supplier) = &result.supplier_name_matched {
            println!("  Supplier: {supplier}");
        }
    } else {
        println!("{} {} not in ledger", "✗".red().bold(), reference.bold());
    }
}

async fn cmd_repair(config: ReconConfig, args: RepairArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let base = args
        .server
        .unwrap_or_else(|| format!("http://{}", config.bind_addr));
    let url = format!("{}/v1/maintenance/repair-orders", base.trim_end_matches('/'));
    let response = reqwest::Client::new()
        .post(&url)
        .send()
        .await
        .with_context(|| format!("calling {url}"))?
        .error_for_status()?;
    let report: RepairReport = response.json().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("{} Repair sweep finished", "✓".green().bold());
            println!("  Scanned: {}", report.scanned);
            println!("  Repaired: {}", report.repaired.to_string().yellow());
            if report.failed > 0 {
                println!("  Failed: {}", report.failed.to_string().red());
            }
        }
    }
    Ok(())
}

fn cmd_check_config(config: ReconConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let stores = config.store_configs()?;
    match format {
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "bind_addr": config.bind_addr,
                "ledger": config.ledger.base_url,
                "stores": stores,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => {
            println!("{} Configuration valid", "✓".green().bold());
            println!("  Bind: {}", config.bind_addr);
            println!("  Ledger: {}", config.ledger.base_url.blue());
            for store in &stores {
                let bl = store.columns.bl_column().unwrap_or("-");
                println!(
                    "  Store {}: {} (invoice {}, bl {})",
                    store.store_id.to_string().yellow(),
                    store.table_name(),
                    store.columns.invoice_column(),
                    bl
                );
            }
        }
    }
    Ok(())
}
