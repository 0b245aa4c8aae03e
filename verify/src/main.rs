// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tickledger_kernel::keys::Ed25519Verifier;
use tickledger_kernel::poh::{verify_chain, worker_count};
use tickledger_node::api::ChainResponse;
use tickledger_node::store::{audit_records, BlockLog, StoreAudit};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the block store (one JSON record per line)
    store: PathBuf,

    /// Chain dump to re-verify, as served by a node's `/chain`
    #[arg(long)]
    chain: Option<PathBuf>,

    /// Verification worker count (default: cores - 1)
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Serialize, Debug)]
struct ChainAudit {
    valid: bool,
    entries: usize,
    failures: Vec<u64>,
    hash_rate: f64,
    hash_rate_per_core: f64,
}

#[derive(Serialize, Debug)]
struct Report {
    store: StoreAudit,
    #[serde(skip_serializing_if = "Option::is_none")]
    chain: Option<ChainAudit>,
    valid: bool,
}

fn audit_chain(path: &PathBuf, workers: Option<usize>) -> Result<ChainAudit> {
    let bytes = fs::read(path).context("Failed to read chain dump")?;
    let dump: ChainResponse = serde_json::from_slice(&bytes).context("Failed to parse chain dump JSON")?;
    let report = verify_chain(&dump.entries, &dump.public_key, &Ed25519Verifier, worker_count(workers))
        .map_err(|e| anyhow::anyhow!("Verification failed to run: {}", e))?;
    Ok(ChainAudit {
        valid: report.is_valid(),
        entries: dump.entries.len(),
        failures: report.failures.into_iter().collect(),
        hash_rate: report.hash_rate,
        hash_rate_per_core: report.hash_rate_per_core,
    })
}

fn run(args: &Args) -> Result<Report> {
    if !args.store.exists() {
        anyhow::bail!("Block store {:?} does not exist", args.store);
    }
    let records = BlockLog::read_all(&args.store).context("Failed to load block store")?;
    eprintln!("Loaded {} blocks from {:?}", records.len(), args.store);
    let store = audit_records(&records).context("Failed to audit block store")?;

    let chain = match &args.chain {
        Some(path) => Some(audit_chain(path, args.workers)?),
        None => None,
    };

    let valid = store.is_valid() && chain.as_ref().map_or(true, |c| c.valid);
    Ok(Report { store, chain, valid })
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    eprintln!("TickLedger Verifier v{}", env!("CARGO_PKG_VERSION"));

    let report = run(&args)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if report.valid { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
