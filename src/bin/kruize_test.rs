//! Kruize createExperiment Conformance Harness
//!
//! CLI tool for running the conformance suite against a Kruize deployment,
//! with CSV-driven matrix cases, named scenarios and multi-format reports.
//!
//! Usage:
//!   kruize-test run --url http://localhost:8080
//!   kruize-test run --config harness.yaml --scenario duplicate_name
//!   kruize-test init --output cases.csv
//!   kruize-test validate cases.csv

use clap::{Parser, Subcommand};
use kruize_conformance::harness::cli::{init_cases, run_suite, validate_cases, RunConfig};
use kruize_conformance::harness::report::{write_report, OutputFormat};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kruize-test")]
#[command(about = "Kruize createExperiment conformance harness")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the conformance suite against a cluster
    Run {
        /// Path to a YAML harness config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Kruize base URL (overrides config file and KRUIZE_URL)
        #[arg(short, long)]
        url: Option<String>,

        /// Cluster type: minikube or openshift
        #[arg(long)]
        cluster: Option<String>,

        /// CSV case file for the negative matrix (generated when absent)
        #[arg(long)]
        cases: Option<PathBuf>,

        /// Run only the named scenario
        #[arg(short, long)]
        scenario: Option<String>,

        /// Output format: text, json, junit
        #[arg(short, long, default_value = "text")]
        output: String,

        /// Write the report to a file instead of stdout
        #[arg(long)]
        report_file: Option<PathBuf>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Write the default negative matrix as an editable CSV
    Init {
        /// Output path for the generated case file
        #[arg(short, long, default_value = "cases.csv")]
        output: PathBuf,
    },

    /// Check a CSV case file without touching a cluster
    Validate {
        /// Path to the case file
        cases: PathBuf,

        /// Print every valid case name
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            url,
            cluster,
            cases,
            scenario,
            output,
            report_file,
            timeout_secs,
        } => {
            let format = match output.parse::<OutputFormat>() {
                Ok(format) => format,
                Err(e) => {
                    eprintln!("❌ {}", e);
                    std::process::exit(2);
                }
            };

            println!("🧪 Kruize Conformance Harness");
            println!("════════════════════════════════════════");
            if let Some(ref c) = config {
                println!("Config: {}", c.display());
            }
            if let Some(ref u) = url {
                println!("Kruize URL: {}", u);
            }
            if let Some(ref c) = cluster {
                println!("Cluster: {}", c);
            }
            if let Some(ref c) = cases {
                println!("Case File: {}", c.display());
            }
            if let Some(ref s) = scenario {
                println!("Scenario Filter: {}", s);
            }
            println!("Output Format: {}", output);
            println!();

            let run = RunConfig {
                config_file: config,
                base_url: url,
                cluster_type: cluster,
                timeout_secs,
                cases_file: cases,
                scenario_filter: scenario,
            };

            let report = match run_suite(&run).await {
                Ok(report) => report,
                Err(e) => {
                    eprintln!("❌ Suite failed to run: {}", e);
                    std::process::exit(2);
                }
            };

            match report_file {
                Some(path) => {
                    let mut file = std::fs::File::create(&path)?;
                    write_report(&report, format, &mut file)?;
                    println!("📄 Report written to {}", path.display());
                    println!(
                        "Cases: {} total, {} passed, {} failed, {} errors, {} skipped",
                        report.summary.total,
                        report.summary.passed,
                        report.summary.failed,
                        report.summary.errors,
                        report.summary.skipped
                    );
                }
                None => {
                    write_report(&report, format, &mut std::io::stdout())?;
                }
            }

            if report.has_failures() {
                std::process::exit(1);
            }
        }

        Commands::Init { output } => match init_cases(&output) {
            Ok(count) => {
                println!("✅ Wrote {} cases to {}", count, output.display());
                println!("💡 Edit {} to adjust fields or expected codes", output.display());
            }
            Err(e) => {
                eprintln!("❌ Failed to write case file: {}", e);
                std::process::exit(1);
            }
        },

        Commands::Validate { cases, verbose } => {
            println!("🔍 Validating case file: {}", cases.display());

            let check = match validate_cases(&cases) {
                Ok(check) => check,
                Err(e) => {
                    eprintln!("❌ {}", e);
                    std::process::exit(1);
                }
            };

            println!();
            println!("📊 Validation Results");
            println!("═════════════════════");
            println!(
                "Total Rows: {}, Valid: {}, Problems: {}",
                check.valid.len() + check.problems.len(),
                check.valid.len(),
                check.problems.len()
            );
            println!();

            if verbose {
                for name in &check.valid {
                    println!("  ✅ {}", name);
                }
            }
            for problem in &check.problems {
                println!("  ❌ {}", problem);
            }

            if check.is_valid() {
                println!("✅ All cases valid!");
            } else {
                println!("❌ Validation failed");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
