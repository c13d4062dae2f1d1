use yield_ops::report::{build_report, render, render_json};
use yield_ops::storage::StrategyDb;
use yield_ops::utils::clock::now_ms;
use yield_ops::utils::config::Config;

const USAGE: &str = "usage: debug_store [--json]";

fn main() {
    yield_ops::utils::env_guard::load_dot_env();
    yield_ops::utils::logging::init_tracing();

    let mut json = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => json = true,
            other => {
                eprintln!("unknown argument `{other}`\n{USAGE}");
                std::process::exit(2);
            }
        }
    }

    if let Err(err) = run(json) {
        println!("\nError during debug: {err:#}");
        std::process::exit(1);
    }
}

fn run(json: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let store_path = config.store_path()?;

    let db = match StrategyDb::open_existing(&store_path) {
        Ok(db) => db,
        Err(err) => {
            println!("Connection failed: {err}");
            std::process::exit(1);
        }
    };

    let report = build_report(&db, now_ms())?;
    if json {
        println!("{}", render_json(&report)?);
        return Ok(());
    }

    println!("Connected to store");
    println!("   URI: {}", config.store_uri);
    println!("   Database: {}", config.store_name);
    println!("   File: {}\n", store_path.display());
    println!("{}", render(&report));
    Ok(())
}
