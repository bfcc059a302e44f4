//! The operations registry.
//!
//! [`Operations`] owns every declared operation of one simulation, keeps
//! at most one integrator, allocates [`OperationId`]s, and drives
//! attachment. Computes and updaters keep their insertion order, which is
//! also their attach order.

use std::sync::Arc;

use corral_backend::{BackendSelector, ComputeHandle, NativeObject, NativeSystem, SimulationContext};
use corral_core::{BackendError, Device, OpError, OperationId};
use corral_ops::{AttachContext, Compute, Declared, Integrator, Operation, Updater};
use indexmap::IndexMap;
use tracing::{info, warn};

use crate::declaration::OperationSpec;

/// Declared operations of one simulation.
#[derive(Default)]
pub struct Operations {
    next_id: u64,
    integrator: Option<Box<dyn Integrator>>,
    computes: IndexMap<OperationId, Box<dyn Compute>>,
    updaters: IndexMap<OperationId, Box<dyn Updater>>,
    auxiliary: Vec<ComputeHandle>,
    installed: Option<Arc<dyn NativeSystem>>,
}

impl Operations {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Declaration ────────────────────────────────────────────────

    /// Declare an operation and return its id.
    ///
    /// An integrator replaces the current one, which is detached,
    /// uninstalled from the native system, and dropped. Computes and
    /// updaters are appended. The new operation is detached until the
    /// next [`schedule`](Self::schedule).
    pub fn add(&mut self, op: impl Into<Declared>) -> OperationId {
        let id = OperationId(self.next_id);
        self.next_id += 1;
        match op.into() {
            Declared::Integrator(mut integrator) => {
                integrator.assign_id(id);
                if let Some(mut old) = self.integrator.replace(integrator) {
                    if let Err(e) = old.detach() {
                        warn!(integrator = %old.label(), error = %e, "detach of replaced integrator failed");
                    }
                    if let Err(e) = self.uninstall() {
                        warn!(integrator = %old.label(), error = %e, "uninstall of replaced integrator failed");
                    }
                    info!(old = %old.label(), new = %id, "integrator replaced");
                }
                self.auxiliary.clear();
            }
            Declared::Compute(mut compute) => {
                compute.assign_id(id);
                self.computes.insert(id, compute);
            }
            Declared::Updater(mut updater) => {
                updater.assign_id(id);
                self.updaters.insert(id, updater);
            }
        }
        id
    }

    /// Build an operation from its declarative form and add it. On error
    /// the registry is unchanged.
    pub fn add_spec(&mut self, spec: &OperationSpec) -> Result<OperationId, OpError> {
        let declared = spec.build()?;
        Ok(self.add(declared))
    }

    /// Detach and remove an operation, handing it back.
    ///
    /// If detaching fails the operation stays registered.
    pub fn remove(&mut self, id: OperationId) -> Result<Declared, OpError> {
        if self.integrator.as_ref().and_then(|i| i.id()) == Some(id) {
            if let Some(integrator) = self.integrator.as_mut() {
                integrator.detach()?;
            }
            self.auxiliary.clear();
            self.uninstall()?;
            if let Some(integrator) = self.integrator.take() {
                return Ok(Declared::Integrator(integrator));
            }
        }
        if let Some(compute) = self.computes.get_mut(&id) {
            compute.detach()?;
            if let Some(compute) = self.computes.shift_remove(&id) {
                return Ok(Declared::Compute(compute));
            }
        }
        if let Some(updater) = self.updaters.get_mut(&id) {
            updater.detach()?;
            if let Some(updater) = self.updaters.shift_remove(&id) {
                return Ok(Declared::Updater(updater));
            }
        }
        Err(OpError::invalid(format!("no operation with id {id}")))
    }

    // ── Attachment ─────────────────────────────────────────────────

    /// Push the context's particle type names to every operation.
    pub fn broadcast_types(&mut self, context: Option<&SimulationContext>) -> Result<(), OpError> {
        let context = context.ok_or_else(|| OpError::not_ready("broadcast_types needs a simulation context"))?;
        let types = context.types();
        if let Some(integrator) = self.integrator.as_mut() {
            integrator.cache_types(types)?;
        }
        for compute in self.computes.values_mut() {
            compute.cache_types(types)?;
        }
        for updater in self.updaters.values_mut() {
            updater.cache_types(types)?;
        }
        Ok(())
    }

    /// Attach every operation to `context`.
    ///
    /// Order: type broadcast, then the integrator (installed as the active
    /// integrator, auxiliary computes retained), then computes against the
    /// new integrator, then updaters. Every call is a full re-attach. The
    /// first failure aborts; the failing operation is left detached.
    pub fn schedule(
        &mut self,
        context: Option<&SimulationContext>,
        selector: &BackendSelector,
        device: &Device,
    ) -> Result<(), OpError> {
        let context = context.ok_or_else(|| OpError::not_ready("schedule needs a simulation context"))?;
        self.broadcast_types(Some(context))?;
        self.auxiliary.clear();

        let base = AttachContext::new(context, selector, device);
        let mut active = None;
        if let Some(integrator) = self.integrator.as_mut() {
            let auxiliary = integrator.attach(&base)?;
            let Some(installed) = integrator.active() else {
                return Err(BackendError::new(integrator.label(), "attach produced no handle").into());
            };
            if let Err(e) = context.system().set_active_integrator(installed.handle.clone()) {
                integrator.detach()?;
                return Err(e.into());
            }
            self.installed = Some(Arc::clone(context.system()));
            info!(
                integrator = %integrator.label(),
                native = installed.handle.label(),
                auxiliary = auxiliary.len(),
                "active integrator installed"
            );
            self.auxiliary = auxiliary;
            active = Some(installed);
        } else {
            context.system().clear_active_integrator()?;
            self.installed = None;
        }

        let ctx = base.with_integrator(active.as_ref());
        for compute in self.computes.values_mut() {
            compute.attach(&ctx)?;
        }
        for updater in self.updaters.values_mut() {
            updater.attach(&ctx)?;
        }
        info!(
            device = %device,
            computes = self.computes.len(),
            updaters = self.updaters.len(),
            "operations scheduled"
        );
        Ok(())
    }

    /// Detach everything: updaters first (deregistering them), then
    /// computes, then the integrator, which is also uninstalled.
    /// Auxiliary computes are released.
    pub fn detach_all(&mut self) -> Result<(), OpError> {
        for updater in self.updaters.values_mut() {
            updater.detach()?;
        }
        for compute in self.computes.values_mut() {
            compute.detach()?;
        }
        if let Some(integrator) = self.integrator.as_mut() {
            integrator.detach()?;
        }
        self.auxiliary.clear();
        self.uninstall()?;
        Ok(())
    }

    /// Clear the active integrator on the system it was installed on.
    fn uninstall(&mut self) -> Result<(), BackendError> {
        if let Some(system) = self.installed.take() {
            system.clear_active_integrator()?;
            info!("active integrator cleared");
        }
        Ok(())
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// The integrator, if declared.
    pub fn integrator(&self) -> Option<&dyn Integrator> {
        self.integrator.as_deref()
    }

    /// Mutable integrator.
    pub fn integrator_mut(&mut self) -> Option<&mut (dyn Integrator + 'static)> {
        self.integrator.as_deref_mut()
    }

    /// A compute by id.
    pub fn compute(&self, id: OperationId) -> Option<&dyn Compute> {
        self.computes.get(&id).map(|c| &**c)
    }

    /// Mutable compute by id.
    pub fn compute_mut(&mut self, id: OperationId) -> Option<&mut (dyn Compute + 'static)> {
        self.computes.get_mut(&id).map(|c| &mut **c)
    }

    /// An updater by id.
    pub fn updater(&self, id: OperationId) -> Option<&dyn Updater> {
        self.updaters.get(&id).map(|u| &**u)
    }

    /// Mutable updater by id.
    pub fn updater_mut(&mut self, id: OperationId) -> Option<&mut (dyn Updater + 'static)> {
        self.updaters.get_mut(&id).map(|u| &mut **u)
    }

    /// Compute ids in insertion order.
    pub fn compute_ids(&self) -> Vec<OperationId> {
        self.computes.keys().copied().collect()
    }

    /// Updater ids in insertion order.
    pub fn updater_ids(&self) -> Vec<OperationId> {
        self.updaters.keys().copied().collect()
    }

    /// Auxiliary computes produced by the last integrator attachment.
    pub fn auxiliary(&self) -> &[ComputeHandle] {
        &self.auxiliary
    }

    /// Number of declared operations.
    pub fn len(&self) -> usize {
        usize::from(self.integrator.is_some()) + self.computes.len() + self.updaters.len()
    }

    /// Whether nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for Operations {
    fn drop(&mut self) {
        if let Err(e) = self.detach_all() {
            warn!(error = %e, "detaching operations on drop failed");
        }
    }
}

impl std::fmt::Debug for Operations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operations")
            .field("integrator", &self.integrator.as_ref().map(|i| i.label()))
            .field("computes", &self.computes.values().map(|c| c.label()).collect::<Vec<_>>())
            .field("updaters", &self.updaters.values().map(|u| u.label()).collect::<Vec<_>>())
            .field("auxiliary", &self.auxiliary.len())
            .field("installed", &self.installed.is_some())
            .finish()
    }
}
