//! Test utilities and mock types for Corral development.
//!
//! Provides a recording [`MockSystem`] (the execution-loop side of the
//! native backend), mock native objects, a fully populated mock
//! [`BackendSelector`](corral_backend::BackendSelector) via
//! [`mock_selector`], and context fixtures.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod native;
pub mod system;

pub use fixtures::{mock_context, two_type_state};
pub use native::{mock_selector, Constructions, MockCompute, MockIntegrator, MockUpdater};
pub use system::{MockSystem, SystemCall};
