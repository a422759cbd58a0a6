/// Default experiment seed
pub static DEFAULT_SEED: u64 = 42;

/// Default number of scan intervals per trial
pub static DEFAULT_TICKS: u64 = 1000;

/// Default number of control loops (channel length)
pub static DEFAULT_LOOPS: usize = 4;

/// Controller scan interval, in hours of process time
pub static SCAN_INTERVAL: f64 = 0.1;

/// Explicit Euler sub-steps per scan interval
pub static ODE_STEPS_PER_SCAN: u32 = 20;

/// Plant time constant, in hours
pub static PLANT_TIME_CONSTANT: f64 = 1.0;

/// Plant static gain
pub static PLANT_GAIN: f64 = 2.0;

/// Proportional controller gain
pub static CONTROLLER_KP: f64 = 0.8;

/// Integral controller gain, per hour
pub static CONTROLLER_KI: f64 = 0.5;

/// Seed stream of the measurement channel
pub static XMEAS_STREAM: u64 = 0;

/// Seed stream of the command channel
pub static XMV_STREAM: u64 = 1;
