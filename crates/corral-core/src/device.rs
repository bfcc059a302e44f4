//! The [`Device`] descriptor used for backend selection.
//!
//! A device never participates in numeric work on this side of the backend
//! boundary. The backend selector consumes its [`DeviceClass`] to pick
//! between host and accelerator implementation sets.

use std::fmt;

/// Coarse execution-resource class: the first axis of backend dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceClass {
    /// General-purpose CPU execution.
    Host,
    /// Offloaded execution on a GPU or similar accelerator.
    Accelerator,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Accelerator => f.write_str("accelerator"),
        }
    }
}

/// The execution device a simulation runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Device {
    /// Host execution.
    Host {
        /// Worker thread count hint for the native backend. `None` lets the
        /// backend decide.
        threads: Option<usize>,
    },
    /// Accelerator execution.
    Accelerator {
        /// Index of the accelerator to run on.
        ordinal: u32,
    },
}

impl Device {
    /// Host device with backend-chosen threading.
    pub fn host() -> Self {
        Self::Host { threads: None }
    }

    /// Accelerator device with the given ordinal.
    pub fn accelerator(ordinal: u32) -> Self {
        Self::Accelerator { ordinal }
    }

    /// The dispatch class of this device.
    pub fn class(&self) -> DeviceClass {
        match self {
            Self::Host { .. } => DeviceClass::Host,
            Self::Accelerator { .. } => DeviceClass::Accelerator,
        }
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::host()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host { threads: Some(n) } => write!(f, "host({n} threads)"),
            Self::Host { threads: None } => f.write_str("host"),
            Self::Accelerator { ordinal } => write!(f, "accelerator[{ordinal}]"),
        }
    }
}
