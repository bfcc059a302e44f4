//! The two-phase lifecycle shared by every operation.
//!
//! An operation starts [`Detached`](AttachState::Detached): parameters are
//! staged in its [`ParameterDict`] and nothing exists on the backend. Attach
//! resolves a constructor, builds the native handle from the staged values,
//! and moves to [`Attached`](AttachState::Attached). Detach releases the
//! handle. The cycle may repeat any number of times.
//!
//! [`OpCore`] holds the state every concrete operation needs and enforces
//! the live-parameter rule while attached.

use std::fmt;
use std::ops::Deref;

use corral_backend::NativeObject;
use corral_core::{OpError, OperationId, OperationKind, ParamError, ParamValue, ParameterDict};
use tracing::{debug, info};

/// Attachment state of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttachState {
    /// Declared, configurable, no backend object.
    Detached,
    /// Bound to a native object.
    Attached,
}

impl fmt::Display for AttachState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detached => f.write_str("detached"),
            Self::Attached => f.write_str("attached"),
        }
    }
}

/// Display label for an operation: `type_name#id`, or just the type name
/// before the registry assigns an id.
pub fn label(type_name: &str, id: Option<OperationId>) -> String {
    match id {
        Some(id) => format!("{type_name}#{id}"),
        None => type_name.to_string(),
    }
}

/// Identity, parameters, and native handle of one operation.
///
/// `H` is the shared handle type (`IntegratorHandle`, `ComputeHandle` or
/// `UpdaterHandle`). The handle is present exactly when attached.
pub struct OpCore<H> {
    kind: OperationKind,
    type_name: &'static str,
    id: Option<OperationId>,
    params: ParameterDict,
    handle: Option<H>,
}

impl<H> OpCore<H> {
    /// A detached core with the given declared parameters.
    pub fn new(kind: OperationKind, type_name: &'static str, params: ParameterDict) -> Self {
        Self {
            kind,
            type_name,
            id: None,
            params,
            handle: None,
        }
    }

    /// Operation kind.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Logical operation name, also the dispatch-table key.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Registry-assigned id, if added.
    pub fn id(&self) -> Option<OperationId> {
        self.id
    }

    /// Record the registry-assigned id.
    pub fn assign_id(&mut self, id: OperationId) {
        self.id = Some(id);
    }

    /// `type_name#id` label.
    pub fn label(&self) -> String {
        label(self.type_name, self.id)
    }

    /// Staged parameters.
    pub fn params(&self) -> &ParameterDict {
        &self.params
    }

    /// Current attachment state.
    pub fn state(&self) -> AttachState {
        if self.handle.is_some() {
            AttachState::Attached
        } else {
            AttachState::Detached
        }
    }

    /// Whether a native handle is held.
    pub fn is_attached(&self) -> bool {
        self.handle.is_some()
    }

    /// The native handle, when attached.
    pub fn handle(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    /// Fail with [`OpError::InvalidArgument`] if attached. For
    /// configuration that has no live path (structural changes).
    pub fn require_detached(&self, what: &str) -> Result<(), OpError> {
        if self.is_attached() {
            return Err(OpError::invalid(format!(
                "cannot change {what} of '{}' while attached",
                self.label()
            )));
        }
        Ok(())
    }

    /// Store the handle built by a successful attach.
    pub fn install(&mut self, handle: H) {
        self.handle = Some(handle);
        info!(operation = %self.label(), "attached");
    }

    /// Drop the handle. Returns whether one was held.
    pub fn release(&mut self) -> bool {
        let held = self.handle.take().is_some();
        if held {
            info!(operation = %self.label(), "detached");
        }
        held
    }
}

impl<H> OpCore<H>
where
    H: Deref,
    H::Target: NativeObject,
{
    /// Write a parameter.
    ///
    /// Detached: validated and staged. Attached: only live keys are
    /// accepted; the value is pushed to the native object first and stored
    /// only if the push succeeds.
    pub fn set_param(&mut self, name: &str, value: ParamValue) -> Result<(), OpError> {
        let Some(handle) = &self.handle else {
            self.params.set(name, value)?;
            return Ok(());
        };
        if !self.params.is_live(name)? {
            return Err(ParamError::NotLive {
                name: name.to_string(),
            }
            .into());
        }
        let value = self.params.check(name, value)?;
        handle.set_param(name, &value)?;
        debug!(operation = %label(self.type_name, self.id), name, %value, "pushed live parameter");
        self.params.set(name, value)?;
        Ok(())
    }
}

impl<H> fmt::Debug for OpCore<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpCore")
            .field("kind", &self.kind)
            .field("type_name", &self.type_name)
            .field("id", &self.id)
            .field("params", &self.params)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_core::{BackendError, ParamKind};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        pushed: Mutex<Vec<(String, ParamValue)>>,
        fail: bool,
    }

    impl NativeObject for Recorder {
        fn label(&self) -> &str {
            "Recorder"
        }

        fn set_param(&self, name: &str, value: &ParamValue) -> Result<(), BackendError> {
            if self.fail {
                return Err(BackendError::new("Recorder", "rejected"));
            }
            self.pushed
                .lock()
                .unwrap()
                .push((name.to_string(), value.clone()));
            Ok(())
        }
    }

    fn core() -> OpCore<Arc<Recorder>> {
        let mut params = ParameterDict::new();
        params.declare_with("kT", ParamKind::Float, true, 1.0).unwrap();
        params.declare_with("seed", ParamKind::Int, false, 7).unwrap();
        OpCore::new(OperationKind::Updater, "rescale_temp", params)
    }

    #[test]
    fn detached_writes_are_staged() {
        let mut c = core();
        c.set_param("seed", ParamValue::Int(9)).unwrap();
        assert_eq!(c.params().int("seed").unwrap(), 9);
        assert_eq!(c.state(), AttachState::Detached);
    }

    #[test]
    fn attached_live_write_is_pushed() {
        let mut c = core();
        let native = Arc::new(Recorder::default());
        c.install(native.clone());
        c.set_param("kT", ParamValue::Int(2)).unwrap();
        assert_eq!(c.params().float("kT").unwrap(), 2.0);
        let pushed = native.pushed.lock().unwrap();
        assert_eq!(pushed.as_slice(), &[("kT".to_string(), ParamValue::Float(2.0))]);
    }

    #[test]
    fn attached_non_live_write_rejected() {
        let mut c = core();
        c.install(Arc::new(Recorder::default()));
        let err = c.set_param("seed", ParamValue::Int(3)).unwrap_err();
        assert_eq!(err, OpError::Param(ParamError::NotLive { name: "seed".into() }));
        assert_eq!(c.params().int("seed").unwrap(), 7);
    }

    #[test]
    fn failed_push_leaves_value_unchanged() {
        let mut c = core();
        c.install(Arc::new(Recorder {
            fail: true,
            ..Recorder::default()
        }));
        assert!(matches!(
            c.set_param("kT", ParamValue::Float(5.0)),
            Err(OpError::Backend(_))
        ));
        assert_eq!(c.params().float("kT").unwrap(), 1.0);
    }

    #[test]
    fn release_returns_to_detached() {
        let mut c = core();
        c.assign_id(OperationId(4));
        assert_eq!(c.label(), "rescale_temp#4");
        c.install(Arc::new(Recorder::default()));
        assert!(c.require_detached("methods").is_err());
        assert!(c.release());
        assert!(!c.release());
        assert_eq!(c.state(), AttachState::Detached);
    }
}
