//! Core types for the Corral operation control plane.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by every other Corral crate: operation ids, the
//! [`Device`] descriptor, integrator [`Family`] identities, updater
//! [`Period`]s, the typed [`ParameterDict`] configuration store, and the
//! error taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod device;
pub mod error;
pub mod family;
pub mod id;
pub mod param;
pub mod period;

pub use device::{Device, DeviceClass};
pub use error::{BackendError, OpError, ParamError, StateMisuse, UnsupportedConfig};
pub use family::{Family, FamilyClass, Shape};
pub use id::{OperationId, OperationKind, Timestep};
pub use param::{ParamKind, ParamValue, ParameterDict, TypeParameter};
pub use period::{Period, VariablePeriod};
