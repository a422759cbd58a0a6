use std::io::{self, BufWriter, Write};

use clap::Parser;
use dotenvy::dotenv;
use errchan_sim::{Result, config::Config, simulation};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=warn", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = Config::parse();
    info!(
        xmeas_rate = %config.xmeas_rate,
        xmv_rate = %config.xmv_rate,
        seed = config.seed,
        "Starting"
    );

    let mut reports = Vec::with_capacity(config.trials as usize);
    let mut first = 0;

    if config.print_states {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        reports.push(simulation::run_trial(&config, 0, Some(&mut out as &mut dyn Write))?);
        out.flush()?;
        first = 1;
    }

    if first < config.trials {
        let progress = ProgressBar::new(config.trials - first);
        progress.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} trials [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        reports.extend(simulation::run_trials(&config, first..config.trials, |_| {
            progress.inc(1)
        })?);
        progress.finish_and_clear();
    }

    println!("xmeas {}  xmv {}", config.xmeas_rate, config.xmv_rate);
    println!("trial\tseed\txmeas_bad\txmv_bad\tiae");
    for (trial, report) in reports.iter().enumerate() {
        println!(
            "{trial}\t{}\t{:.4}\t{:.4}\t{:.4}",
            report.seed, report.xmeas_bad_fraction, report.xmv_bad_fraction, report.iae
        );
    }

    let n = reports.len() as f64;
    let mean_iae = reports.iter().map(|r| r.iae).sum::<f64>() / n;
    println!("mean iae {mean_iae:.4}");

    Ok(())
}
