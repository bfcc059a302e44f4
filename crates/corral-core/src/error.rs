//! Error types for the Corral control plane.
//!
//! Organized by subsystem: parameter validation ([`ParamError`]), native
//! backend failures ([`BackendError`]), backend selection and integrator
//! compatibility ([`UnsupportedConfig`]), and the umbrella [`OpError`]
//! returned by registry, attachment, and scheduler calls.
//!
//! Enabling an already-enabled updater (or disabling a disabled one) is not
//! an error; it is reported as a [`StateMisuse`] warning and leaves state
//! unchanged.

use std::fmt;

use thiserror::Error;

use crate::device::DeviceClass;
use crate::family::{Family, FamilyClass};
use crate::param::ParamKind;

/// Errors from [`ParameterDict`](crate::ParameterDict) and
/// [`TypeParameter`](crate::TypeParameter) validation.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ParamError {
    /// The key was never declared.
    #[error("unknown parameter '{name}'")]
    UnknownKey {
        /// The rejected key.
        name: String,
    },
    /// The value's kind does not match the declared kind.
    #[error("parameter '{name}' expects {expected}, got {found}")]
    KindMismatch {
        /// The parameter key.
        name: String,
        /// The declared kind.
        expected: ParamKind,
        /// The kind that was supplied.
        found: ParamKind,
    },
    /// A required parameter has no value.
    #[error("parameter '{name}' has no value")]
    Missing {
        /// The parameter key (type-indexed keys render as `name[type]`).
        name: String,
    },
    /// The parameter cannot change while the operation is attached.
    #[error("parameter '{name}' cannot be changed while attached")]
    NotLive {
        /// The parameter key.
        name: String,
    },
    /// A particle type referenced by a parameter is not part of the state.
    #[error("parameter '{name}' references unknown particle type '{type_name}'")]
    UnknownType {
        /// The parameter key.
        name: String,
        /// The unknown type name.
        type_name: String,
    },
    /// The value has the right kind but is out of range.
    #[error("invalid value for '{name}': {reason}")]
    InvalidValue {
        /// The parameter key.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// A failure reported by the native compute backend.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("native '{object}' failed: {reason}")]
pub struct BackendError {
    /// Label of the native object or subsystem that failed.
    pub object: String,
    /// Backend-supplied description.
    pub reason: String,
}

impl BackendError {
    /// Build an error for the given native object.
    pub fn new(object: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            reason: reason.into(),
        }
    }
}

/// No backend implementation fits the requested configuration.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum UnsupportedConfig {
    /// The dispatch table has no constructor for this
    /// `(operation, family, device)` triple.
    #[error(
        "no {device} implementation of '{operation}' for family {}",
        FamilyLabel(.family)
    )]
    NoBackend {
        /// Logical operation name.
        operation: String,
        /// Requested family, `None` for family-independent lookups.
        family: Option<Family>,
        /// Requested device class.
        device: DeviceClass,
    },
    /// The operation needs an active integrator and none is installed.
    #[error("'{operation}' requires an active {required} integrator, but none is set")]
    MissingIntegrator {
        /// Logical operation name.
        operation: String,
        /// The required integrator class.
        required: FamilyClass,
    },
    /// The active integrator belongs to the wrong family.
    #[error("'{operation}' requires a {required} integrator, but the active one is {found}")]
    WrongIntegrator {
        /// Logical operation name.
        operation: String,
        /// The required integrator class.
        required: FamilyClass,
        /// The family of the active integrator.
        found: Family,
    },
}

struct FamilyLabel<'a>(&'a Option<Family>);

impl fmt::Display for FamilyLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(family) => write!(f, "{family}"),
            None => f.write_str("<any>"),
        }
    }
}

/// Errors from registry, attachment, and periodic-scheduler calls.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum OpError {
    /// No simulation context exists yet. Retry after initialization.
    #[error("not ready: {what}")]
    NotReady {
        /// What was missing.
        what: String,
    },
    /// A malformed argument was rejected; state is unchanged.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Description of the rejected argument.
        reason: String,
    },
    /// Backend selection or integrator compatibility failed. The attach
    /// call left nothing behind.
    #[error("unsupported configuration: {0}")]
    Unsupported(#[from] UnsupportedConfig),
    /// Enable/disable/read called before the operation was attached.
    #[error("operation '{name}' is not attached")]
    NotAttached {
        /// Label of the operation.
        name: String,
    },
    /// Parameter validation failed.
    #[error(transparent)]
    Param(#[from] ParamError),
    /// The native backend reported a failure.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl OpError {
    /// Shorthand for [`OpError::NotReady`].
    pub fn not_ready(what: impl Into<String>) -> Self {
        Self::NotReady { what: what.into() }
    }

    /// Shorthand for [`OpError::InvalidArgument`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

/// A recoverable misuse of the enable/disable protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateMisuse {
    /// `enable()` on an updater that is already enabled.
    AlreadyEnabled,
    /// `disable()` on an updater that is already disabled.
    AlreadyDisabled,
}

impl fmt::Display for StateMisuse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyEnabled => f.write_str("updater is already enabled"),
            Self::AlreadyDisabled => f.write_str("updater is already disabled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::Shape;

    #[test]
    fn no_backend_names_family_and_device() {
        let err = UnsupportedConfig::NoBackend {
            operation: "sdf".into(),
            family: Some(Family::Hpmc(Shape::Sphere)),
            device: DeviceClass::Accelerator,
        };
        let msg = err.to_string();
        assert!(msg.contains("accelerator"), "{msg}");
        assert!(msg.contains("hpmc:sphere"), "{msg}");
        assert!(msg.contains("sdf"), "{msg}");
    }

    #[test]
    fn family_independent_lookup_renders_any() {
        let err = UnsupportedConfig::NoBackend {
            operation: "sort".into(),
            family: None,
            device: DeviceClass::Host,
        };
        assert_eq!(err.to_string(), "no host implementation of 'sort' for family <any>");
    }

    #[test]
    fn param_errors_convert_into_op_errors() {
        let err: OpError = ParamError::Missing { name: "dx".into() }.into();
        assert!(matches!(err, OpError::Param(ParamError::Missing { .. })));
        assert_eq!(err.to_string(), "parameter 'dx' has no value");
    }
}
