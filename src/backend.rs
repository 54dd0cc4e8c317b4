//! Compute backends
//!
//! The grid driver hands its work units to a [`ComputeBackend`] chosen
//! at solver construction time. A backend owns a fixed set of logical
//! devices; units are labeled with a device slot round-robin by unit
//! index, so every slot processes a disjoint subset of the grid.

use rayon::prelude::*;

use crate::error::{Error, Result};

/// Strategy interface over the available compute devices
///
/// Implementations run independent work units in parallel and barrier
/// until the whole batch has finished; the driver performs the
/// reduction afterwards. Workers share no mutable state.
pub trait ComputeBackend: Send + Sync {
    /// Number of logical devices this backend drives
    fn device_count(&self) -> usize;

    /// Short human-readable backend identifier
    fn label(&self) -> &'static str;

    /// Run all `units`, each on its assigned device slot, and collect
    /// the results in unit order. The first failing unit aborts the
    /// batch.
    fn execute<T, R, W>(&self, units: Vec<T>, worker: W) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        W: Fn(usize, T) -> Result<R> + Sync;
}

/// CPU backend with one worker thread per logical device
///
/// The thread pool is dedicated to this backend, so concurrently living
/// solver instances do not contend for a global pool.
pub struct CpuBackend {
    devices: usize,
    pool: rayon::ThreadPool,
}

impl CpuBackend {
    /// Create a backend with one device per available CPU
    pub fn detect() -> Result<Self> {
        Self::with_devices(available_devices())
    }

    /// Create a backend with an explicit device count
    ///
    /// Fails with [`Error::DeviceUnavailable`] when more devices are
    /// requested than the machine offers.
    pub fn with_devices(devices: usize) -> Result<Self> {
        let available = available_devices();
        if devices == 0 || devices > available {
            return Err(Error::DeviceUnavailable {
                requested: devices,
                available,
            });
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(devices)
            .build()
            .map_err(|e| Error::EngineFailure(e.to_string()))?;

        Ok(CpuBackend { devices, pool })
    }
}

impl ComputeBackend for CpuBackend {
    fn device_count(&self) -> usize {
        self.devices
    }

    fn label(&self) -> &'static str {
        "cpu"
    }

    fn execute<T, R, W>(&self, units: Vec<T>, worker: W) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        W: Fn(usize, T) -> Result<R> + Sync,
    {
        let devices = self.devices;
        self.pool.install(|| {
            units
                .into_par_iter()
                .enumerate()
                .map(|(idx, unit)| worker(idx % devices, unit))
                .collect()
        })
    }
}

fn available_devices() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
