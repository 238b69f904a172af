use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use wallet_consensus_sync::persistence::{load_snapshot, save_snapshot};
use wallet_consensus_sync::sync::engine::{OutputKind, ProcessedTransaction};
use wallet_consensus_sync::sync::types::{Address, BlockHeight};
use wallet_consensus_sync::sync::LoggingDefragSink;
use wallet_consensus_sync::{ConsensusChange, SharedAddressBook, Transaction, Wallet, WalletConfig};

#[derive(Parser)]
#[command(author, version, about = "Replays consensus changes into a wallet")]
struct Args {
    /// JSON array of consensus changes, applied in order.
    #[arg(long)]
    changes: PathBuf,

    /// JSON array of pool transactions applied after the replay.
    #[arg(long)]
    unconfirmed: Option<PathBuf>,

    /// Address owned by the wallet (hex). May be repeated.
    #[arg(long = "owned")]
    owned: Vec<Address>,

    /// Wallet snapshot, loaded before the replay and saved after it.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// JSON config file. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    maturity_delay: Option<BlockHeight>,

    #[arg(long)]
    defrag_threshold: Option<usize>,

    #[arg(long)]
    defrag_batch_size: Option<usize>,

    #[arg(long)]
    defrag_start_index: Option<usize>,
}

impl Args {
    fn wallet_config(&self) -> Result<WalletConfig> {
        let mut config = match &self.config {
            Some(path) => WalletConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => WalletConfig::default(),
        };
        if let Some(delay) = self.maturity_delay {
            config.maturity_delay = delay;
        }
        if let Some(threshold) = self.defrag_threshold {
            config.defrag.threshold = threshold;
        }
        if let Some(batch_size) = self.defrag_batch_size {
            config.defrag.batch_size = batch_size;
        }
        if let Some(start_index) = self.defrag_start_index {
            config.defrag.start_index = start_index;
        }
        Ok(config)
    }
}

struct ReplayStats {
    changes: usize,
    total_time: Duration,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = args.wallet_config()?;

    log::info!("[MAIN] {:?}", config);

    let state = match &args.snapshot {
        Some(path) => load_snapshot(path)?.unwrap_or_default(),
        None => Default::default(),
    };
    let addresses: SharedAddressBook = args.owned.iter().copied().collect();
    log::info!("[MAIN] Tracking {} addresses", addresses.len());

    let wallet = Wallet::from_state(config, state, addresses, Arc::new(LoggingDefragSink))?;

    let changes: Vec<ConsensusChange> = read_json(&args.changes)?;
    let stats = replay(&wallet, &changes)?;

    if let Some(path) = &args.unconfirmed {
        let txns: Vec<Transaction> = read_json(path)?;
        wallet.receive_unconfirmed_transactions(&txns)?;
    }

    print_summary(&wallet, &stats)?;

    if let Some(path) = &args.snapshot {
        save_snapshot(path, &wallet.snapshot()?)?;
    }

    wallet.close()?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("decoding {}", path.display()))
}

fn replay(wallet: &Wallet<SharedAddressBook>, changes: &[ConsensusChange]) -> Result<ReplayStats> {
    let t0 = Instant::now();
    for (i, cc) in changes.iter().enumerate() {
        wallet
            .process_consensus_change(cc)
            .with_context(|| format!("consensus change #{}", i))?;
    }
    Ok(ReplayStats {
        changes: changes.len(),
        total_time: t0.elapsed(),
    })
}

fn print_summary(wallet: &Wallet<SharedAddressBook>, stats: &ReplayStats) -> Result<()> {
    let balance = wallet.confirmed_balance()?;
    let confirmed = wallet.transactions()?;
    let unconfirmed = wallet.unconfirmed_transactions()?;

    println!();
    println!("==================================================");
    println!("                  WALLET SUMMARY                  ");
    println!("==================================================");
    println!("{:<20} | {}", "Changes replayed", stats.changes);
    println!("{:<20} | {:?}", "Replay time", stats.total_time);
    println!("{:<20} | {}", "Height", wallet.height()?);
    println!("{:<20} | {}", "Fund pool", wallet.fund_pool()?);
    println!("--------------------------------------------------");
    println!("{:<20} | {}", "Coins", balance.coins);
    println!("{:<20} | {}", "Funds", balance.funds);
    println!("{:<20} | {}", "Claims", balance.claims);
    println!("--------------------------------------------------");
    println!("{:<20} | {}", "Confirmed entries", confirmed.len());
    println!("{:<20} | {}", "Unconfirmed entries", unconfirmed.len());
    println!("==================================================");

    for pt in confirmed.iter().chain(unconfirmed.iter()) {
        print_entry(pt);
    }
    Ok(())
}

fn print_entry(pt: &ProcessedTransaction) {
    let height = if pt.is_confirmed() {
        pt.confirmation_height.to_string()
    } else {
        "-".into()
    };
    println!("{} @ {}", pt.transaction_id, height);

    for input in pt.inputs.iter().filter(|i| i.owned) {
        let kind = format!("{:?}", input.kind);
        println!("    in  {:<12} {:>20}", kind, input.value);
    }
    for output in pt.outputs.iter().filter(|o| o.owned) {
        let maturity = match output.kind {
            OutputKind::MinerPayout | OutputKind::Claim => {
                format!(" (matures at {})", output.maturity_height)
            }
            _ => String::new(),
        };
        let kind = format!("{:?}", output.kind);
        println!("    out {:<12} {:>20}{}", kind, output.value, maturity);
    }
}
