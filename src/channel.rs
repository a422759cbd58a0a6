use std::{fmt, io};

use tracing::{instrument, trace, warn};

use crate::{
    error::{InvalidArgument, Result},
    random::UniformSource,
    rate::RateSpec,
};

static GOOD_STATE: bool = true;
static BAD_STATE: bool = false;

/// Observational counters kept alongside the chains.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelStats {
    ticks: u64,
    bad_ticks: Vec<u64>,
}

impl ChannelStats {
    fn new(dlen: usize) -> Self {
        Self {
            ticks: 0,
            bad_ticks: vec![0; dlen],
        }
    }

    /// Number of completed `apply` calls.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ticks each index ended in the bad state.
    pub fn bad_ticks(&self) -> &[u64] {
        &self.bad_ticks
    }

    /// Fraction of index-ticks that ended bad, over all indices.
    pub fn bad_fraction(&self) -> f64 {
        if self.ticks == 0 || self.bad_ticks.is_empty() {
            return 0.0;
        }

        let bad: u64 = self.bad_ticks.iter().sum();
        bad as f64 / (self.ticks as f64 * self.bad_ticks.len() as f64)
    }
}

/// Per-index two-state Markov error channel with hold-last-value
/// substitution.
///
/// Every index runs its own good/bad chain. On each [`apply`](Self::apply)
/// the chain steps first, and a sample whose chain ended bad is replaced by
/// the last value that went through that index.
pub struct ErrorChannel {
    rate: RateSpec,
    states: Vec<bool>,
    previous: Vec<f64>,
    source: UniformSource,
    stats: ChannelStats,
}

impl ErrorChannel {
    /// Creates a channel of `dlen` indices, all good, holding `initial`.
    pub fn new(rate: RateSpec, dlen: usize, initial: &[f64], seed: u64) -> Result<Self> {
        if dlen == 0 {
            return Err(InvalidArgument::ZeroLength.into());
        }
        if initial.is_empty() {
            return Err(InvalidArgument::MissingInitialValues.into());
        }
        if initial.len() != dlen {
            return Err(InvalidArgument::LengthMismatch {
                expected: dlen,
                actual: initial.len(),
            }
            .into());
        }

        if !rate.is_probability() {
            warn!(%rate, "Rates outside [0, 1]");
        }

        Ok(Self {
            rate,
            states: vec![GOOD_STATE; dlen],
            previous: initial.to_vec(),
            source: UniformSource::new(seed),
            stats: ChannelStats::new(dlen),
        })
    }

    /// Passes one vector through the channel.
    ///
    /// `data` is mutated in place and the same buffer is returned; nothing is
    /// allocated. A length mismatch is rejected before any draw is consumed,
    /// leaving the channel untouched.
    #[instrument(level = "trace", skip_all, fields(tick = self.stats.ticks))]
    pub fn apply<'a>(&mut self, data: &'a mut [f64]) -> Result<&'a mut [f64]> {
        if data.len() != self.dlen() {
            return Err(InvalidArgument::LengthMismatch {
                expected: self.dlen(),
                actual: data.len(),
            }
            .into());
        }

        for (i, value) in data.iter_mut().enumerate() {
            let r = self.source.draw();
            let was = self.states[i];

            let p = if was == GOOD_STATE {
                self.rate.p_down()
            } else {
                self.rate.p_up()
            };

            // A passed test flips the state.
            if r <= p {
                self.states[i] = !was;
            }

            if self.states[i] != was {
                trace!(index = i, r, good = self.states[i], "Channel transition");
            }

            if self.states[i] == BAD_STATE {
                *value = self.previous[i];
                self.stats.bad_ticks[i] += 1;
            }
            self.previous[i] = *value;
        }

        self.stats.ticks += 1;
        Ok(data)
    }

    /// Writes the current states as tab separated `1`/`0` flags.
    ///
    /// No trailing tab and no newline.
    pub fn print<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<()> {
        write!(sink, "{self}")
    }

    /// Channel length.
    pub fn dlen(&self) -> usize {
        self.states.len()
    }

    /// Transition rates.
    pub fn rate(&self) -> RateSpec {
        self.rate
    }

    /// Current states, `true` meaning good.
    pub fn states(&self) -> &[bool] {
        &self.states
    }

    /// Last committed value per index.
    pub fn previous(&self) -> &[f64] {
        &self.previous
    }

    /// Number of indices currently bad.
    pub fn bad_count(&self) -> usize {
        self.states.iter().filter(|&&s| s == BAD_STATE).count()
    }

    /// Counters since construction.
    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }
}

impl fmt::Display for ErrorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &good) in self.states.iter().enumerate() {
            if i > 0 {
                f.write_str("\t")?;
            }
            f.write_str(if good { "1" } else { "0" })?;
        }
        Ok(())
    }
}
