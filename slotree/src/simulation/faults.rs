//! Record store wrapper with fault injection.
//!
//! Each store call fails with a configured probability before reaching the
//! wrapped store, so a failed call never has a partial effect on it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::storage::{RecordId, RecordStore, RecordStoreError};

/// Failure probabilities per store call (0.0 - 1.0).
#[derive(Debug, Clone, Default)]
pub struct FaultConfig {
    /// Probability that `append` fails.
    pub append_failure_rate: f64,
    /// Probability that `fetch` fails.
    pub fetch_failure_rate: f64,
    /// Probability that `invalidate` fails.
    pub invalidate_failure_rate: f64,
}

impl FaultConfig {
    /// The same failure rate for every call.
    #[must_use]
    pub const fn uniform(rate: f64) -> Self {
        Self {
            append_failure_rate: rate,
            fetch_failure_rate: rate,
            invalidate_failure_rate: rate,
        }
    }

    /// Whether any fault can be injected.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.append_failure_rate > 0.0
            || self.fetch_failure_rate > 0.0
            || self.invalidate_failure_rate > 0.0
    }
}

/// A [`RecordStore`] that fails calls at random.
pub struct FaultyRecordStore<S> {
    inner: S,
    rng: StdRng,
    config: FaultConfig,
    active: bool,
    injected: u64,
}

impl<S: RecordStore> FaultyRecordStore<S> {
    /// Wrap `inner`, drawing faults from `seed`.
    #[must_use]
    pub fn new(inner: S, seed: u64, config: FaultConfig) -> Self {
        Self {
            inner,
            rng: StdRng::seed_from_u64(seed),
            config,
            active: true,
            injected: 0,
        }
    }

    /// Enable or disable injection. Disabled calls go straight through and
    /// draw nothing from the fault stream.
    pub const fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// The wrapped store.
    #[must_use]
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of faults injected so far.
    #[must_use]
    pub const fn injected(&self) -> u64 {
        self.injected
    }

    fn maybe_fail(&mut self, rate: f64, call: &str) -> Result<(), RecordStoreError> {
        if self.active && rate > 0.0 && self.rng.random::<f64>() < rate {
            self.injected += 1;
            tracing::debug!("Injecting fault into {call}");
            return Err(RecordStoreError::Io(std::io::Error::other(format!(
                "injected {call} fault"
            ))));
        }
        Ok(())
    }
}

impl<S: RecordStore> RecordStore for FaultyRecordStore<S> {
    fn append(&mut self, payload: &str) -> Result<RecordId, RecordStoreError> {
        self.maybe_fail(self.config.append_failure_rate, "append")?;
        self.inner.append(payload)
    }

    fn fetch(&mut self, id: RecordId) -> Result<Option<String>, RecordStoreError> {
        self.maybe_fail(self.config.fetch_failure_rate, "fetch")?;
        self.inner.fetch(id)
    }

    fn invalidate(&mut self, id: RecordId) -> Result<bool, RecordStoreError> {
        self.maybe_fail(self.config.invalidate_failure_rate, "invalidate")?;
        self.inner.invalidate(id)
    }

    fn sync(&mut self) -> Result<(), RecordStoreError> {
        self.inner.sync()
    }
}
