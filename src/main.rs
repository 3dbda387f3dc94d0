use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use itertools::Itertools;
use tracing_subscriber::EnvFilter;

use venue_admission::{evaluate, run_seeded, PolicyConfig, Scenario};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyKind {
    Greedy,
    Threshold,
}

/// Simulate a night at the door with a chosen admission policy.
#[derive(Debug, Parser)]
#[command(name = "venue-admission")]
struct Args {
    /// Scenario JSON file. Defaults to the built-in "Classic Berlin Night".
    #[arg(long)]
    scenario: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "greedy")]
    policy: PolicyKind,
    #[arg(long, default_value_t = 0.0)]
    start_threshold: f64,
    #[arg(long, default_value_t = 0.1)]
    end_threshold: f64,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Number of independently seeded nights.
    #[arg(long, default_value_t = 1)]
    runs: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), venue_admission::Error> {
    let scenario = match &args.scenario {
        Some(path) => Scenario::from_json_file(path)?,
        None => Scenario::classic_berlin_night(),
    };
    let config = match args.policy {
        PolicyKind::Greedy => PolicyConfig::Greedy,
        PolicyKind::Threshold => PolicyConfig::ThresholdScore {
            start_threshold: args.start_threshold,
            end_threshold: args.end_threshold,
            base_attribute_value: venue_admission::policy::BASE_ATTRIBUTE_VALUE,
        },
    };
    let policy = config.build()?;

    println!("--- Venue Admission Simulation ---");
    println!("Running Scenario: '{}'", scenario.name);
    println!("Venue Capacity: {}", scenario.venue_capacity);
    println!(
        "Constraints: {}",
        scenario.constraints.iter().map(|(attr, p)| format!("{attr} >= {:.2}%", p * 100.0)).join(", ")
    );
    println!("Using Policy: '{}'", policy.name());
    println!("{}", "-".repeat(20));

    if args.runs > 1 {
        let eval = evaluate(&scenario, policy.as_ref(), args.seed, args.runs)?;
        println!("--- Evaluation over {} nights ---", eval.runs);
        println!("Success Rate: {:.2}%", eval.success_rate() * 100.0);
        println!("Mean Admissions: {:.1}", eval.mean_admissions);
        println!("Mean Rejections: {:.1}", eval.mean_rejections);
        return Ok(());
    }

    let result = run_seeded(&scenario, policy.as_ref(), args.seed)?;
    println!("--- Simulation Results ---");
    println!("Total Admissions: {}", result.admissions);
    println!("Total Rejections: {}", result.rejections);
    println!("Constraints Met: {}", if result.constraints_met { "SUCCESS" } else { "FAILURE" });
    println!();
    println!("Final Venue State:");
    for (attr, proportion) in &result.venue_state {
        let required = scenario.constraints.get(attr).copied().unwrap_or(0.0);
        println!("  - {attr}: {:.2}% (Required: {:.2}%)", proportion * 100.0, required * 100.0);
    }
    Ok(())
}
