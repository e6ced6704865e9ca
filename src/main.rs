use anyhow::Result;
use std::env;

use fraud_triage::{
    load_data, Decision, EvaluatorHandle, SqliteStore, TransactionStatus, TriageCoordinator,
};

const DEFAULT_DATA_PATH: &str = "data.json";
const DEFAULT_DB_PATH: &str = "triage.db";

fn data_path() -> String {
    env::var("TRIAGE_DATA").unwrap_or_else(|_| DEFAULT_DATA_PATH.to_string())
}

fn db_path() -> String {
    env::var("TRIAGE_DB").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("run");

    match command {
        "run" => run_triage().await,
        "dispose" => run_dispose(&args).await,
        "ledger" => run_ledger(&args),
        "export" => run_export(&args),
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!("Usage: fraud-triage [run | dispose <id> <resolved|escalated> | ledger [page] [size] | export [file]]");
            std::process::exit(1);
        }
    }
}

/// Build a coordinator over the configured database and rehydrate it.
fn open_coordinator() -> Result<TriageCoordinator<SqliteStore>> {
    let store = SqliteStore::open(db_path())?;
    let (evaluator, _worker) = EvaluatorHandle::spawn(16);

    let mut coordinator = TriageCoordinator::new(store, evaluator);
    coordinator.init()?;

    Ok(coordinator)
}

async fn run_triage() -> Result<()> {
    println!("🔎 Fraud Triage - Threshold Evaluation");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut coordinator = open_coordinator()?;

    let data = load_data(data_path());
    println!("✓ Loaded {} transactions", data.transactions.len());
    println!(
        "✓ Thresholds: amount > {} OR fraud score > {}",
        data.thresholds.amount, data.thresholds.fraud_score
    );

    coordinator.load_data(data);

    let flagged = coordinator.evaluate(None).await?;

    println!("\n🚩 Flagged: {} transactions", flagged.len());
    for tx in flagged {
        println!(
            "   #{:<6} ${:<10} {}  {}  score {}",
            tx.id,
            tx.amount.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string()),
            tx.date,
            tx.kind,
            tx.fraud_score.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
        );
    }

    println!(
        "\n✓ Reviewed so far: {} resolved, {} escalated",
        coordinator.count_by_status(TransactionStatus::Resolved),
        coordinator.count_by_status(TransactionStatus::Escalated)
    );

    Ok(())
}

async fn run_dispose(args: &[String]) -> Result<()> {
    let id: i64 = args
        .get(2)
        .ok_or_else(|| anyhow::anyhow!("Usage: fraud-triage dispose <id> <resolved|escalated>"))?
        .parse()?;
    let decision: Decision = args
        .get(3)
        .ok_or_else(|| anyhow::anyhow!("Usage: fraud-triage dispose <id> <resolved|escalated>"))?
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let mut coordinator = open_coordinator()?;
    coordinator.load_data(load_data(data_path()));

    let entry = coordinator.dispose_transaction(id, decision)?;

    println!(
        "✓ Transaction {} disposed as {:?} at {}",
        entry.id(),
        decision,
        entry.disposed_at
    );

    Ok(())
}

fn run_ledger(args: &[String]) -> Result<()> {
    let page: usize = args.get(2).map(|s| s.parse()).transpose()?.unwrap_or(1);
    let page_size: usize = args.get(3).map(|s| s.parse()).transpose()?.unwrap_or(10);

    let coordinator = open_coordinator()?;

    println!("📒 Review Ledger - page {} ({} per page)", page, page_size);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let entries = coordinator.ledger_page(page, page_size);
    if entries.is_empty() {
        println!("   (no entries on this page)");
    }
    for entry in entries {
        println!(
            "   #{:<6} {:?}  disposed {}",
            entry.id(),
            entry.status(),
            entry.disposed_at
        );
    }

    println!(
        "\n✓ Totals: {} resolved, {} escalated ({} entries)",
        coordinator.count_by_status(TransactionStatus::Resolved),
        coordinator.count_by_status(TransactionStatus::Escalated),
        coordinator.ledger_len()
    );

    Ok(())
}

fn run_export(args: &[String]) -> Result<()> {
    let out = args
        .get(2)
        .map(String::as_str)
        .unwrap_or("flagged_transactions.csv");

    let coordinator = open_coordinator()?;
    let csv = coordinator.export_flagged_csv()?;

    std::fs::write(out, &csv)?;

    println!("✓ Exported {} flagged transactions to {}", coordinator.flagged().len(), out);

    Ok(())
}
