use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, BufRead, Write};
use yield_ops::error::OpsError;
use yield_ops::seed::args::{answer_is_yes, parse_seed_args, ClearMode, SeedArgs};
use yield_ops::seed::Seeder;
use yield_ops::storage::StrategyDb;
use yield_ops::utils::clock::now_ms;
use yield_ops::utils::config::Config;
use yield_ops::utils::constants::{READY_MIN_RECORDS, READY_WINDOW_DAYS};

const RULE: &str = "============================================================";

fn main() {
    yield_ops::utils::env_guard::load_dot_env();
    yield_ops::utils::logging::init_tracing();

    if let Err(err) = run() {
        match err.downcast_ref::<OpsError>() {
            Some(ops) if ops.is_connectivity_failure() => println!("\nConnection failed: {ops}"),
            _ => println!("\nSetup failed: {err:#}"),
        }
        std::process::exit(1);
    }
}

fn ask_clear() -> anyhow::Result<bool> {
    print!("Clear and recreate? (yes/no): ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer_is_yes(&answer))
}

fn run() -> anyhow::Result<()> {
    let args: SeedArgs = parse_seed_args()?;

    println!("Strategy Store Setup");
    println!("{RULE}");

    let config = Config::load()?;
    let store_path = config.store_path()?;
    let seeder = Seeder::new(StrategyDb::open(&store_path)?);
    println!("Connected to store: {}", store_path.display());

    if args.cleanup_only {
        let removed = seeder.cleanup()?;
        println!("\nCleanup complete:");
        println!("  Deleted {} strategies", removed.strategies);
        println!("  Deleted {} performance records", removed.performance);
        println!("  Deleted {} recommendations", removed.recommendations);
        println!("  Deleted {} nonces", removed.nonces);
        return Ok(());
    }

    let existing = seeder.check_existing()?;
    println!("\nCurrent Database State:");
    println!("  Total strategies: {}", existing.strategies);
    println!("  Active strategies: {}", existing.active);
    println!("  Performance records: {}", existing.performance);

    let clear = match args.clear {
        ClearMode::Always => true,
        ClearMode::Never => false,
        ClearMode::Prompt if existing.is_empty() => false,
        ClearMode::Prompt => {
            println!("\nDatabase already has data!");
            ask_clear()?
        }
    };

    let now = now_ms();
    let mut rng = match args.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    println!("\nCreating test data...");
    if clear {
        println!("  Clearing existing strategies and performance data");
    }
    let strategies = seeder.create_strategies(args.strategies, clear, now)?;
    println!("Created {} test strategies", strategies.len());

    let written = seeder.populate_performance(&strategies, args.days, clear, now, &mut rng)?;
    for (index, count) in &written {
        println!("  Added {count} records for Strategy {index}");
    }
    println!(
        "Total performance records created: {}",
        written.iter().map(|(_, n)| n).sum::<usize>()
    );

    println!("\nCreating indexes...");
    seeder.ensure_indexes()?;
    println!("Indexes created");

    println!("\nVerifying Setup...");
    let verification = seeder.verify(now)?;
    if verification.rows.is_empty() {
        println!("No active strategies found!");
    }
    for row in &verification.rows {
        println!(
            "[{}] Strategy {}: {} records in last {READY_WINDOW_DAYS} days (need >={READY_MIN_RECORDS})",
            if row.ready { "ok" } else { "!!" },
            row.index,
            row.last_30d
        );
    }
    if verification.all_ready() {
        println!("\nDatabase is ready for prediction runs!");
    } else {
        println!("\nSome strategies don't have enough data");
    }

    println!("\n{RULE}");
    println!("Setup complete!");
    println!("{RULE}");
    Ok(())
}
