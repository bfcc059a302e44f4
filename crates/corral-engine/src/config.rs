//! Simulation configuration, validation, and error types.
//!
//! [`SimulationConfig`] is the input for constructing a
//! [`Simulation`](crate::Simulation). [`validate()`](SimulationConfig::validate)
//! checks structural invariants before anything touches the backend.

use corral_core::Device;
use thiserror::Error;

use corral_ops::Sort;

// ── SortDefaults ───────────────────────────────────────────────────

/// Settings of the particle sorter declared automatically at
/// initialization.
#[derive(Clone, Debug, PartialEq)]
pub struct SortDefaults {
    /// Cadence in steps. Default: 500.
    pub period: u64,
    /// Sorting grid spacing. Default: 1.0.
    pub bin_width: f64,
}

impl Default for SortDefaults {
    fn default() -> Self {
        Self {
            period: Sort::DEFAULT_PERIOD,
            bin_width: Sort::DEFAULT_BIN_WIDTH,
        }
    }
}

// ── SimulationConfig ───────────────────────────────────────────────

/// Top-level configuration of a simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Device every operation is attached on. Default: host, automatic
    /// thread count.
    pub device: Device,
    /// Declare a [`Sort`] updater at initialization. `None` disables
    /// automatic sorting.
    pub auto_sort: Option<SortDefaults>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            device: Device::default(),
            auto_sort: Some(SortDefaults::default()),
        }
    }
}

impl SimulationConfig {
    /// Configuration for `device` with default sorting.
    pub fn on(device: Device) -> Self {
        Self {
            device,
            ..Self::default()
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. An explicit host thread count must be usable.
        if let Device::Host { threads: Some(0) } = self.device {
            return Err(ConfigError::ZeroThreads);
        }
        // 2. Sorter cadence and grid.
        if let Some(sort) = &self.auto_sort {
            if sort.period == 0 {
                return Err(ConfigError::ZeroSortPeriod);
            }
            if !sort.bin_width.is_finite() || sort.bin_width <= 0.0 {
                return Err(ConfigError::InvalidBinWidth {
                    value: sort.bin_width,
                });
            }
        }
        Ok(())
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected by [`SimulationConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// `Device::Host { threads: Some(0) }`.
    #[error("host thread count must be at least 1")]
    ZeroThreads,
    /// `auto_sort.period == 0`.
    #[error("sort period must be at least 1 step")]
    ZeroSortPeriod,
    /// `auto_sort.bin_width` is not finite and positive.
    #[error("sort bin width must be finite and positive, got {value}")]
    InvalidBinWidth {
        /// The rejected value.
        value: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = SimulationConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.auto_sort.as_ref().map(|s| s.period), Some(500));
    }

    #[test]
    fn zero_threads_rejected() {
        let cfg = SimulationConfig::on(Device::Host { threads: Some(0) });
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroThreads));
        assert!(SimulationConfig::on(Device::accelerator(1)).validate().is_ok());
    }

    #[test]
    fn sorter_settings_validated() {
        let mut cfg = SimulationConfig::default();
        cfg.auto_sort = Some(SortDefaults {
            period: 0,
            bin_width: 1.0,
        });
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroSortPeriod));

        cfg.auto_sort = Some(SortDefaults {
            period: 10,
            bin_width: f64::NAN,
        });
        match cfg.validate() {
            Err(ConfigError::InvalidBinWidth { .. }) => {}
            other => panic!("expected InvalidBinWidth, got {other:?}"),
        }

        cfg.auto_sort = None;
        assert!(cfg.validate().is_ok());
    }
}
