use clap::Parser;

use crate::{common::*, rate::RateSpec};

/// Networked control loop with Markov error channels.
///
/// Rates are given as `pDown` or `pDown:pUp`; a bare value sets the recovery
/// rate and leaves the failure rate at zero.
#[derive(Clone, Debug, Parser)]
#[command(name = "errchan-sim", version, about)]
pub struct Config {
    /// Measurement channel rates (plant to controller)
    #[arg(long, default_value = "0")]
    pub xmeas_rate: RateSpec,

    /// Command channel rates (controller to plant)
    #[arg(long, default_value = "0")]
    pub xmv_rate: RateSpec,

    /// Root seed; every trial and channel derives its own seed from it
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Scan intervals per trial
    #[arg(long, default_value_t = DEFAULT_TICKS)]
    pub ticks: u64,

    /// Number of independent trials
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub trials: u64,

    /// Number of control loops, i.e. the channel length
    #[arg(long, default_value_t = DEFAULT_LOOPS, value_parser = parse_loops)]
    pub loops: usize,

    /// Controller scan interval, in hours
    #[arg(long, default_value_t = SCAN_INTERVAL, value_parser = parse_scan_interval)]
    pub scan_interval: f64,

    /// Print channel states of the first trial, one line per tick
    #[arg(long)]
    pub print_states: bool,
}

fn parse_loops(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("at least one loop is required".into()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_scan_interval(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(dt) if dt.is_finite() && dt > 0.0 => Ok(dt),
        Ok(dt) => Err(format!("scan interval must be positive and finite, got {dt}")),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn test_defaults() {
        let config = Config::try_parse_from(["errchan-sim"]).unwrap();

        assert_eq!(config.xmeas_rate, RateSpec::new(0.0, 0.0));
        assert_eq!(config.xmv_rate, RateSpec::new(0.0, 0.0));
        assert_eq!(config.seed, DEFAULT_SEED);
        assert_eq!(config.ticks, DEFAULT_TICKS);
        assert_eq!(config.trials, 1);
        assert_eq!(config.loops, DEFAULT_LOOPS);
        assert!(!config.print_states);
    }

    #[test_log::test]
    fn test_rate_tokens() {
        let config = Config::try_parse_from([
            "errchan-sim",
            "--xmeas-rate",
            "0.01:0.2",
            "--xmv-rate",
            "0.5",
            "--seed",
            "7",
            "--print-states",
        ])
        .unwrap();

        assert_eq!(config.xmeas_rate, RateSpec::new(0.01, 0.2));
        assert_eq!(config.xmv_rate, RateSpec::new(0.0, 0.5));
        assert_eq!(config.seed, 7);
        assert!(config.print_states);
    }

    #[test_log::test]
    fn test_rejects_bad_arguments() {
        assert!(Config::try_parse_from(["errchan-sim", "--xmeas-rate", "x:1"]).is_err());
        assert!(Config::try_parse_from(["errchan-sim", "--loops", "0"]).is_err());
        assert!(Config::try_parse_from(["errchan-sim", "--trials", "0"]).is_err());
    }

    #[test_log::test]
    fn test_scan_interval_must_be_positive_and_finite() {
        for bad in ["0", "-0.1", "nan", "inf", "fast"] {
            assert!(
                Config::try_parse_from(["errchan-sim", "--scan-interval", bad]).is_err(),
                "accepted {bad}"
            );
        }

        let config = Config::try_parse_from(["errchan-sim", "--scan-interval", "0.05"]).unwrap();
        assert_eq!(config.scan_interval, 0.05);
    }
}
