use anyhow::Context;
use yield_ops::error::OpsError;
use yield_ops::nonce::{ContractNonceSource, NonceReconciler, ReconcileOutcome};
use yield_ops::storage::StrategyDb;
use yield_ops::utils::config::Config;

const RULE: &str = "============================================================";

#[tokio::main]
async fn main() {
    yield_ops::utils::env_guard::load_dot_env();
    yield_ops::utils::logging::init_tracing();

    if let Err(err) = run().await {
        match err.downcast_ref::<OpsError>() {
            Some(ops) if ops.is_connectivity_failure() => {
                println!("\nConnectivity failure, nothing was written: {ops}");
            }
            _ => println!("\nNonce synchronization failed: {err:#}"),
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    println!("Nonce Synchronization Utility");
    println!("{RULE}");

    let config = Config::load()?;
    let chain = config.chain()?;

    let store_path = config.store_path()?;
    let db = StrategyDb::open(&store_path)?;
    println!("Connected to store: {}", store_path.display());

    let source = ContractNonceSource::from_config(&chain)?;
    let chain_id = source.chain_id().await?;
    println!("Connected to blockchain: chain id {chain_id}");

    let agent = chain.agent_address();
    println!("\nAgent address: {agent}");
    println!("Strategy manager: {}", source.contract());

    let reconciler =
        NonceReconciler::new(source, db).with_page_size(config.reconcile_page_size);
    let report = reconciler
        .reconcile(agent)
        .await
        .with_context(|| format!("reconciling nonce for {agent}"))?;

    println!("\nChecking nonces...");
    println!("   Blockchain nonce: {}", report.onchain);
    match report.cached {
        Some(cached) => println!("   Cached nonce:     {cached}"),
        None => println!("   Cached nonce:     (not set)"),
    }

    if report.outcome == ReconcileOutcome::InSync {
        println!("\nNonces are already in sync!");
        return Ok(());
    }

    println!("\nNonces are OUT OF SYNC!");
    println!("   Difference: {}", report.difference());

    println!("\nChecking pending recommendations...");
    for expired in &report.expired {
        println!(
            "   Expired recommendation {}: nonce {} -> {}",
            expired.id, expired.old_nonce, report.onchain
        );
    }
    for failed in &report.failed {
        println!("   Could not expire recommendation {}: {}", failed.id, failed.error);
    }
    if report.expired.is_empty() && report.failed.is_empty() {
        println!("\nNo pending recommendations with wrong nonce");
    } else if !report.expired.is_empty() {
        println!(
            "\nMarked {} recommendation(s) as expired due to wrong nonce",
            report.expired.len()
        );
        println!("   Re-run the signer to create new recommendations");
    }

    if report.outcome == ReconcileOutcome::Incomplete {
        println!(
            "\n{} recommendation(s) could not be expired; cached nonce left unchanged",
            report.failed.len()
        );
        println!("   Re-run sync_nonces to finish the sweep");
        return Ok(());
    }
    println!("\nCached nonce set to blockchain value ({})", report.onchain);

    println!("\n{RULE}");
    println!("Nonce synchronization complete!");
    println!("   Current nonce: {}", report.onchain);
    println!("   Next prediction will use nonce: {}", report.onchain);
    println!("{RULE}");
    Ok(())
}
