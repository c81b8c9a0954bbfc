use anyhow::{bail, Context};
use chainkv_ledger::{Block, Blockchain, ChainReport};
use chainkv_store::open_store;
use colored::Colorize;
use serde::Serialize;
use serde_json::json;

use crate::cli::*;
use crate::config::CliConfig;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = CliConfig::load(cli.config.as_deref())?;
    config.apply_overrides(&cli);

    let store = open_store(&config.store).with_context(|| {
        format!(
            "opening {} store at {}",
            config.store.backend,
            config.store.path.display()
        )
    })?;
    let chain: Blockchain = Blockchain::with_config(store, &config.ledger);

    let outcome = execute(&chain, cli.command, cli.format).await;
    let closed = chain.close().await.context("closing store");
    outcome?;
    closed
}

async fn execute(chain: &Blockchain, command: Command, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        Command::Init => cmd_init(chain, format).await,
        Command::Add(args) => cmd_add(chain, args, format).await,
        Command::Height => cmd_height(chain, format).await,
        Command::Show(args) => cmd_show(chain, args, format).await,
        Command::VerifyBlock(args) => cmd_verify_block(chain, args, format).await,
        Command::Verify => cmd_verify(chain, format).await,
        Command::Log(args) => cmd_log(chain, args, format).await,
        #[cfg(feature = "fault-injection")]
        Command::Tamper(args) => cmd_tamper(chain, args, format).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_block(block: &Block) {
    println!("{} {}", "Block".bold(), block.height.to_string().yellow().bold());
    println!("  Hash:     {}", block.hash.cyan());
    println!("  Previous: {}", block.previous_block_hash.dimmed());
    println!("  Time:     {}", block.time);
    println!("  Body:     {}", block.body);
}

async fn cmd_init(chain: &Blockchain, format: OutputFormat) -> anyhow::Result<()> {
    chain.initialize().await.context("initializing ledger")?;
    let height = chain.get_block_height().await?;
    match format {
        OutputFormat::Json => print_json(&json!({ "height": height })),
        OutputFormat::Text => {
            println!("{} Ledger ready at height {}", "✓".green().bold(), height.to_string().bold());
            Ok(())
        }
    }
}

async fn cmd_add(chain: &Blockchain, args: AddArgs, format: OutputFormat) -> anyhow::Result<()> {
    let block = chain
        .add_block(Block::new(args.body))
        .await
        .context("appending block")?;
    match format {
        OutputFormat::Json => print_json(&block),
        OutputFormat::Text => {
            println!(
                "{} Appended block {} {}",
                "✓".green().bold(),
                block.height.to_string().yellow().bold(),
                block.hash.dimmed()
            );
            Ok(())
        }
    }
}

async fn cmd_height(chain: &Blockchain, format: OutputFormat) -> anyhow::Result<()> {
    let height = chain.get_block_height().await?;
    match format {
        OutputFormat::Json => print_json(&json!({ "height": height })),
        OutputFormat::Text => {
            println!("{height}");
            Ok(())
        }
    }
}

async fn cmd_show(chain: &Blockchain, args: HeightArgs, format: OutputFormat) -> anyhow::Result<()> {
    let block = chain.get_block(args.height).await?;
    match format {
        OutputFormat::Json => print_json(&block),
        OutputFormat::Text => {
            print_block(&block);
            Ok(())
        }
    }
}

async fn cmd_verify_block(
    chain: &Blockchain,
    args: HeightArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let valid = chain.validate_block(args.height).await?;
    match format {
        OutputFormat::Json => print_json(&json!({ "height": args.height, "valid": valid }))?,
        OutputFormat::Text if valid => {
            println!("{} Block {} hash valid", "✓".green().bold(), args.height.to_string().bold());
        }
        OutputFormat::Text => {
            println!("{} Block {} hash mismatch", "✗".red().bold(), args.height.to_string().bold());
        }
    }
    if !valid {
        bail!("block {} failed its hash check", args.height);
    }
    Ok(())
}

async fn cmd_verify(chain: &Blockchain, format: OutputFormat) -> anyhow::Result<()> {
    let report = chain.validate_chain().await.context("validating chain")?;
    match format {
        OutputFormat::Json => print_json(&report_json(&report))?,
        OutputFormat::Text => print_report(&report),
    }
    if !report.is_valid() {
        bail!("chain invalid at heights {:?}", report.faulty_heights());
    }
    Ok(())
}

fn report_json(report: &ChainReport) -> serde_json::Value {
    let violations: Vec<_> = report
        .violations
        .iter()
        .map(|v| json!({ "height": v.height, "kind": v.kind.to_string() }))
        .collect();
    json!({
        "height": report.height,
        "valid": report.is_valid(),
        "faulty": report.faulty_heights(),
        "violations": violations,
    })
}

fn print_report(report: &ChainReport) {
    if report.is_valid() {
        println!("{} Chain integrity verified", "✓".green().bold());
        println!("  Height: {}", report.height.to_string().bold());
        return;
    }
    println!("{} Chain integrity broken", "✗".red().bold());
    println!("  Height: {}", report.height.to_string().bold());
    for violation in &report.violations {
        println!(
            "  {} {}",
            violation.height.to_string().yellow(),
            violation.kind.to_string().red()
        );
    }
}

async fn cmd_log(chain: &Blockchain, args: LogArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut blocks = chain.blocks().await.context("reading chain")?;
    if let Some(limit) = args.limit {
        let skip = blocks.len().saturating_sub(limit);
        blocks.drain(..skip);
    }

    match format {
        OutputFormat::Json => return print_json(&blocks),
        OutputFormat::Text if blocks.is_empty() => println!("Ledger is empty."),
        OutputFormat::Text if args.oneline => {
            for block in &blocks {
                println!(
                    "{} {} {}",
                    block.height.to_string().yellow(),
                    short_hash(&block.hash).dimmed(),
                    block.body
                );
            }
        }
        OutputFormat::Text => {
            for block in &blocks {
                print_block(block);
            }
        }
    }
    Ok(())
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

#[cfg(feature = "fault-injection")]
async fn cmd_tamper(chain: &Blockchain, args: TamperArgs, format: OutputFormat) -> anyhow::Result<()> {
    let block = chain.update_block(args.height, args.body).await?;
    match format {
        OutputFormat::Json => print_json(&block),
        OutputFormat::Text => {
            println!(
                "{} Overwrote body of block {} without re-hashing",
                "!".yellow().bold(),
                block.height.to_string().bold()
            );
            Ok(())
        }
    }
}
