//! Closed-loop driver for the error channels.
//!
//! A plant and a controller exchange measurement (`xmeas`) and command
//! (`xmv`) vectors once per scan interval. Each vector crosses its own
//! [`ErrorChannel`] exactly once per interval:
//!
//! ```text
//! plant --xmeas--> [meas channel] --> controller --xmv--> [cmd channel] --> plant
//! ```

use std::io::Write;

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::{
    channel::ErrorChannel,
    common::*,
    config::Config,
    error::{InvalidArgument, Result},
    random::derive_seed,
    rate::RateSpec,
};

/// Physical process side of the loop.
pub trait Plant {
    /// Current measured outputs.
    fn measurements(&self) -> Vec<f64>;

    /// Advances the process by `dt` under commands `xmv` and returns the new
    /// measurements.
    fn increment(&mut self, dt: f64, xmv: &[f64]) -> Vec<f64>;
}

/// Controller side of the loop.
pub trait Controller {
    /// Commands currently applied.
    fn commands(&self) -> Vec<f64>;

    /// Runs one scan on the delivered measurements and returns new commands.
    fn increment(&mut self, xmeas: &[f64]) -> Vec<f64>;

    /// Setpoints the measurements are driven towards.
    fn setpoints(&self) -> &[f64];
}

/// Independent first-order lags, `tau * x' = -x + gain * u`.
pub struct FirstOrderPlant {
    x: Vec<f64>,
    tau: f64,
    gain: f64,
    ode_steps: u32,
}

impl FirstOrderPlant {
    /// Creates `n` lags resting at `x0`.
    pub fn new(n: usize, x0: f64) -> Self {
        Self {
            x: vec![x0; n],
            tau: PLANT_TIME_CONSTANT,
            gain: PLANT_GAIN,
            ode_steps: ODE_STEPS_PER_SCAN,
        }
    }

    fn euler(&mut self, dt: f64, u: &[f64]) {
        for (x, &u) in self.x.iter_mut().zip(u) {
            *x += dt * (-*x + self.gain * u) / self.tau;
        }
    }
}

impl Plant for FirstOrderPlant {
    fn measurements(&self) -> Vec<f64> {
        self.x.clone()
    }

    fn increment(&mut self, dt: f64, xmv: &[f64]) -> Vec<f64> {
        let h = dt / self.ode_steps as f64;
        for _ in 0..self.ode_steps {
            self.euler(h, xmv);
        }
        self.measurements()
    }
}

/// Per-loop PI controller with a fixed scan interval.
pub struct PiController {
    setpoints: Vec<f64>,
    integral: Vec<f64>,
    u: Vec<f64>,
    kp: f64,
    ki: f64,
    dt: f64,
}

impl PiController {
    /// Creates a controller for `setpoints`, starting from zero commands.
    pub fn new(setpoints: Vec<f64>, dt: f64) -> Self {
        let n = setpoints.len();
        Self {
            setpoints,
            integral: vec![0.0; n],
            u: vec![0.0; n],
            kp: CONTROLLER_KP,
            ki: CONTROLLER_KI,
            dt,
        }
    }
}

impl Controller for PiController {
    fn commands(&self) -> Vec<f64> {
        self.u.clone()
    }

    fn increment(&mut self, xmeas: &[f64]) -> Vec<f64> {
        for (i, &y) in xmeas.iter().enumerate() {
            let e = self.setpoints[i] - y;
            self.integral[i] += e * self.dt;
            self.u[i] = self.kp * e + self.ki * self.integral[i];
        }
        self.commands()
    }

    fn setpoints(&self) -> &[f64] {
        &self.setpoints
    }
}

/// Outcome of one trial.
#[derive(Clone, Debug, PartialEq)]
pub struct TrialReport {
    /// Trial seed
    pub seed: u64,
    /// Scan intervals run
    pub ticks: u64,
    /// Fraction of measurement samples held
    pub xmeas_bad_fraction: f64,
    /// Fraction of command samples held
    pub xmv_bad_fraction: f64,
    /// Integral of absolute tracking error, summed over loops
    pub iae: f64,
}

/// Plant and controller joined by two error channels.
pub struct ClosedLoop<P, C> {
    plant: P,
    controller: C,
    meas_channel: ErrorChannel,
    cmd_channel: ErrorChannel,
    xmv: Vec<f64>,
    dt: f64,
    time: f64,
    iae: f64,
}

impl<P: Plant, C: Controller> ClosedLoop<P, C> {
    /// Joins `plant` and `controller`.
    ///
    /// Each channel starts out holding the current vector of its producer, and
    /// draws from its own stream of `seed`. Measurements, commands and
    /// setpoints must all have the same length.
    pub fn new(
        plant: P,
        controller: C,
        xmeas_rate: RateSpec,
        xmv_rate: RateSpec,
        seed: u64,
        dt: f64,
    ) -> Result<Self> {
        let xmeas = plant.measurements();
        let xmv = controller.commands();

        for actual in [xmv.len(), controller.setpoints().len()] {
            if actual != xmeas.len() {
                return Err(InvalidArgument::LengthMismatch {
                    expected: xmeas.len(),
                    actual,
                }
                .into());
            }
        }

        let meas_channel = ErrorChannel::new(
            xmeas_rate,
            xmeas.len(),
            &xmeas,
            derive_seed(seed, XMEAS_STREAM),
        )?;
        let cmd_channel =
            ErrorChannel::new(xmv_rate, xmv.len(), &xmv, derive_seed(seed, XMV_STREAM))?;

        Ok(Self {
            plant,
            controller,
            meas_channel,
            cmd_channel,
            xmv,
            dt,
            time: 0.0,
            iae: 0.0,
        })
    }

    /// Runs one scan interval.
    pub fn tick(&mut self) -> Result<()> {
        let mut xmeas = self.plant.increment(self.dt, &self.xmv);

        let error: f64 = xmeas
            .iter()
            .zip(self.controller.setpoints())
            .map(|(y, sp)| (sp - y).abs())
            .sum();
        self.iae += error * self.dt;

        self.meas_channel.apply(&mut xmeas)?;

        let mut xmv = self.controller.increment(&xmeas);
        self.cmd_channel.apply(&mut xmv)?;
        self.xmv = xmv;

        self.time += self.dt;
        Ok(())
    }

    /// Runs `ticks` scan intervals, writing one status line per tick to
    /// `sink` when given.
    ///
    /// Line layout is `time<TAB>xmeas flags<TAB>xmv flags`.
    pub fn run(&mut self, ticks: u64, mut sink: Option<&mut dyn Write>) -> Result<()> {
        for _ in 0..ticks {
            self.tick()?;

            if let Some(sink) = sink.as_deref_mut() {
                write!(sink, "{:.4}\t", self.time)?;
                self.meas_channel.print(&mut *sink)?;
                sink.write_all(b"\t")?;
                self.cmd_channel.print(&mut *sink)?;
                sink.write_all(b"\n")?;
            }
        }
        Ok(())
    }

    /// Process time elapsed.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Integral of absolute tracking error so far.
    pub fn iae(&self) -> f64 {
        self.iae
    }

    /// Current plant measurements, before the channel.
    pub fn measurements(&self) -> Vec<f64> {
        self.plant.measurements()
    }

    /// Measurement channel.
    pub fn meas_channel(&self) -> &ErrorChannel {
        &self.meas_channel
    }

    /// Command channel.
    pub fn cmd_channel(&self) -> &ErrorChannel {
        &self.cmd_channel
    }
}

fn setpoints(loops: usize) -> Vec<f64> {
    (1..=loops).map(|i| i as f64).collect()
}

/// Runs a single trial of the default plant and controller.
#[instrument(skip(config, sink))]
pub fn run_trial(config: &Config, trial: u64, sink: Option<&mut dyn Write>) -> Result<TrialReport> {
    let seed = derive_seed(config.seed, trial);
    let plant = FirstOrderPlant::new(config.loops, 0.0);
    let controller = PiController::new(setpoints(config.loops), config.scan_interval);

    let mut control_loop = ClosedLoop::new(
        plant,
        controller,
        config.xmeas_rate,
        config.xmv_rate,
        seed,
        config.scan_interval,
    )?;
    debug!(seed, "Trial started");

    control_loop.run(config.ticks, sink)?;

    let report = TrialReport {
        seed,
        ticks: config.ticks,
        xmeas_bad_fraction: control_loop.meas_channel().stats().bad_fraction(),
        xmv_bad_fraction: control_loop.cmd_channel().stats().bad_fraction(),
        iae: control_loop.iae(),
    };
    debug!(?report, "Trial finished");

    Ok(report)
}

/// Runs trials `range` in parallel, calling `on_done` as each finishes.
///
/// Reports come back in trial order.
pub fn run_trials<F>(
    config: &Config,
    range: std::ops::Range<u64>,
    on_done: F,
) -> Result<Vec<TrialReport>>
where
    F: Fn(&TrialReport) + Sync,
{
    range
        .into_par_iter()
        .map(|trial| {
            let report = run_trial(config, trial, None)?;
            on_done(&report);
            Ok(report)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use clap::Parser;

    fn config(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("errchan-sim").chain(args.iter().copied())).unwrap()
    }

    #[test_log::test]
    fn test_plant_settles_to_gain_times_input() {
        let mut plant = FirstOrderPlant::new(2, 0.0);
        let mut y = Vec::new();
        for _ in 0..200 {
            y = plant.increment(0.1, &[1.0, -0.5]);
        }

        assert!((y[0] - PLANT_GAIN).abs() < 1e-3);
        assert!((y[1] + 0.5 * PLANT_GAIN).abs() < 1e-3);
    }

    #[test_log::test]
    fn test_mismatched_plant_and_controller_rejected() {
        let result = ClosedLoop::new(
            FirstOrderPlant::new(3, 0.0),
            PiController::new(vec![1.0, 1.0], 0.1),
            RateSpec::new(0.0, 0.0),
            RateSpec::new(0.0, 0.0),
            1,
            0.1,
        );

        assert!(matches!(
            result,
            Err(Error::InvalidArgument(InvalidArgument::LengthMismatch {
                expected: 3,
                actual: 2
            }))
        ));

        let result = ClosedLoop::new(
            FirstOrderPlant::new(1, 0.0),
            PiController::new(vec![1.0, 1.0], 0.1),
            RateSpec::new(0.0, 0.0),
            RateSpec::new(0.0, 0.0),
            1,
            0.1,
        );
        assert!(result.is_err());
    }

    #[test_log::test]
    fn test_perfect_channels_track_setpoints() {
        let sp = vec![1.0, 2.0, 3.0];
        let mut control_loop = ClosedLoop::new(
            FirstOrderPlant::new(3, 0.0),
            PiController::new(sp.clone(), 0.1),
            RateSpec::new(0.0, 0.0),
            RateSpec::new(0.0, 0.0),
            1,
            0.1,
        )
        .unwrap();

        control_loop.run(1000, None).unwrap();

        for (y, sp) in control_loop.measurements().iter().zip(&sp) {
            assert!((y - sp).abs() < 1e-3, "{y} did not settle to {sp}");
        }
        assert_eq!(control_loop.meas_channel().stats().bad_fraction(), 0.0);
        assert_eq!(control_loop.cmd_channel().stats().bad_fraction(), 0.0);
        assert!((control_loop.time() - 100.0).abs() < 1e-6);
    }

    #[test_log::test]
    fn test_dead_command_channel_freezes_plant_input() {
        let mut control_loop = ClosedLoop::new(
            FirstOrderPlant::new(2, 0.0),
            PiController::new(vec![1.0, 1.0], 0.1),
            RateSpec::new(0.0, 0.0),
            RateSpec::new(1.0, 0.0),
            5,
            0.1,
        )
        .unwrap();

        control_loop.run(100, None).unwrap();

        // Commands are held at their initial zero, so the plant never moves.
        assert_eq!(control_loop.measurements(), vec![0.0, 0.0]);
        assert_eq!(control_loop.cmd_channel().previous(), &[0.0, 0.0]);
        assert_eq!(control_loop.cmd_channel().stats().bad_fraction(), 1.0);
    }

    #[test_log::test]
    fn test_status_lines() {
        let mut control_loop = ClosedLoop::new(
            FirstOrderPlant::new(3, 0.0),
            PiController::new(vec![1.0; 3], 0.1),
            RateSpec::new(0.0, 0.0),
            RateSpec::new(1.0, 0.0),
            5,
            0.1,
        )
        .unwrap();

        let mut out = Vec::new();
        control_loop.run(2, Some(&mut out as &mut dyn Write)).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["0.1000\t1\t1\t1\t0\t0\t0", "0.2000\t1\t1\t1\t0\t0\t0"]);
    }

    #[test_log::test]
    fn test_trials_are_reproducible() {
        let config = config(&["--xmeas-rate", "0.1:0.3", "--xmv-rate", "0.05:0.5", "--ticks", "300"]);

        let a = run_trials(&config, 0..4, |_| {}).unwrap();
        let b = run_trials(&config, 0..4, |_| {}).unwrap();
        assert_eq!(a, b);

        let single = run_trial(&config, 2, None).unwrap();
        assert_eq!(a[2], single);

        assert_ne!(a[0].seed, a[1].seed);
        assert!(a.iter().all(|r| r.xmeas_bad_fraction > 0.0));
    }

    #[test_log::test]
    fn test_dead_measurement_channel_degrades_tracking() {
        let clean = run_trial(&config(&["--ticks", "500"]), 0, None).unwrap();
        let lossy = run_trial(
            &config(&["--ticks", "500", "--xmeas-rate", "1:0"]),
            0,
            None,
        )
        .unwrap();

        assert_eq!(clean.xmeas_bad_fraction, 0.0);
        assert_eq!(lossy.xmeas_bad_fraction, 1.0);
        assert!(lossy.iae > clean.iae);
    }
}
