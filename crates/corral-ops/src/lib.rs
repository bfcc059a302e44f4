//! Operations for Corral: integrators, computes, and updaters.
//!
//! Every operation follows the same two-phase lifecycle
//! ([`attachment`]): it is declared and configured while detached, then
//! attached to a live simulation through a backend constructor chosen by
//! the [`BackendSelector`](corral_backend::BackendSelector). Updaters add
//! the [`periodic`] scheduler interface on top.
//!
//! Concrete operations:
//!
//! | Kind | Type | Module |
//! |------|------|--------|
//! | integrator | [`HpmcIntegrator`] | [`hpmc`] |
//! | integrator | [`MdIntegrator`] | [`md`] |
//! | compute | [`FreeVolume`], [`Sdf`] | [`compute`] |
//! | updater | [`Sort`], [`RescaleTemp`], [`ZeroMomentum`] | [`update`] |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod attachment;
pub mod compute;
pub mod hpmc;
pub mod md;
pub mod operation;
pub mod periodic;
pub mod update;

pub use attachment::{AttachState, OpCore};
pub use compute::{FreeVolume, Sdf};
pub use hpmc::HpmcIntegrator;
pub use md::{MdIntegrator, MdMethod};
pub use operation::{ActiveIntegrator, AttachContext, Compute, Declared, Integrator, Operation, Updater};
pub use periodic::{PeriodicControl, Toggle, UpdaterSchedule};
pub use update::{RescaleTemp, Sort, UpdaterCore, ZeroMomentum};
