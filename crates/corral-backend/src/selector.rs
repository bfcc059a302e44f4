//! Backend selection by explicit dispatch tables.
//!
//! The native backend populates a [`BackendSelector`] at startup with one
//! constructor per `(operation, family, device class)` it implements.
//! Operations then resolve their constructor at attach time.
//!
//! Resolution narrows by device class first, then by family within that
//! device's set. A family-independent entry ([`FamilyKey::Any`]) serves any
//! family on the same device. Nothing ever falls back across devices or
//! to a different family: a miss is an
//! [`UnsupportedConfig::NoBackend`] naming the operation, family and device.

use std::fmt;
use std::sync::Arc;

use corral_core::{BackendError, DeviceClass, Family, UnsupportedConfig};
use indexmap::IndexMap;
use tracing::debug;

use crate::native::{BuildArgs, ComputeHandle, IntegratorBuild, UpdaterHandle};

/// Family component of a dispatch key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FamilyKey {
    /// Serves every family (and the no-integrator case).
    Any,
    /// Serves exactly one family.
    Exact(Family),
}

/// Constructor for a native integrator.
pub type IntegratorCtor =
    Arc<dyn Fn(&BuildArgs<'_>) -> Result<IntegratorBuild, BackendError> + Send + Sync>;
/// Constructor for a native compute.
pub type ComputeCtor =
    Arc<dyn Fn(&BuildArgs<'_>) -> Result<ComputeHandle, BackendError> + Send + Sync>;
/// Constructor for a native updater.
pub type UpdaterCtor =
    Arc<dyn Fn(&BuildArgs<'_>) -> Result<UpdaterHandle, BackendError> + Send + Sync>;

type Lane<C> = IndexMap<(&'static str, FamilyKey), C>;

/// One dispatch table: a host lane and an accelerator lane.
pub struct DispatchTable<C> {
    host: Lane<C>,
    accelerator: Lane<C>,
}

impl<C> DispatchTable<C> {
    /// Empty table.
    pub fn new() -> Self {
        Self {
            host: IndexMap::new(),
            accelerator: IndexMap::new(),
        }
    }

    fn lane(&self, device: DeviceClass) -> &Lane<C> {
        match device {
            DeviceClass::Host => &self.host,
            DeviceClass::Accelerator => &self.accelerator,
        }
    }

    /// Register a constructor, returning the one it replaced.
    pub fn insert(
        &mut self,
        operation: &'static str,
        family: FamilyKey,
        device: DeviceClass,
        ctor: C,
    ) -> Option<C> {
        let lane = match device {
            DeviceClass::Host => &mut self.host,
            DeviceClass::Accelerator => &mut self.accelerator,
        };
        lane.insert((operation, family), ctor)
    }

    /// Resolve a constructor.
    ///
    /// `family` is the family to serve (`None` when no integrator is
    /// involved). An exact entry wins over an `Any` entry on the same device.
    pub fn resolve(
        &self,
        operation: &str,
        family: Option<Family>,
        device: DeviceClass,
    ) -> Result<&C, UnsupportedConfig> {
        let lane = self.lane(device);
        let exact = family.and_then(|f| Self::find(lane, operation, FamilyKey::Exact(f)));
        exact
            .or_else(|| Self::find(lane, operation, FamilyKey::Any))
            .ok_or_else(|| UnsupportedConfig::NoBackend {
                operation: operation.to_string(),
                family,
                device,
            })
    }

    /// Whether [`resolve`](Self::resolve) would succeed.
    pub fn supports(&self, operation: &str, family: Option<Family>, device: DeviceClass) -> bool {
        self.resolve(operation, family, device).is_ok()
    }

    /// Registered `(operation, family)` keys for one device, in insertion order.
    pub fn registered(&self, device: DeviceClass) -> Vec<(&'static str, FamilyKey)> {
        self.lane(device).keys().copied().collect()
    }

    /// Total number of constructors across both lanes.
    pub fn len(&self) -> usize {
        self.host.len() + self.accelerator.len()
    }

    /// Whether no constructor is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find<'t>(lane: &'t Lane<C>, operation: &str, family: FamilyKey) -> Option<&'t C> {
        // Keys are covariant, so a 'static-keyed lane answers borrowed lookups.
        let index = {
            let lane: &IndexMap<(&str, FamilyKey), C> = lane;
            lane.get_index_of(&(operation, family))?
        };
        lane.get_index(index).map(|(_, ctor)| ctor)
    }
}

impl<C> Default for DispatchTable<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// The three dispatch tables, one per operation kind.
#[derive(Default)]
pub struct BackendSelector {
    integrators: DispatchTable<IntegratorCtor>,
    computes: DispatchTable<ComputeCtor>,
    updaters: DispatchTable<UpdaterCtor>,
}

impl BackendSelector {
    /// Empty selector. Every lookup fails until the backend registers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an integrator constructor for one family on one device.
    pub fn register_integrator<F>(
        &mut self,
        operation: &'static str,
        family: Family,
        device: DeviceClass,
        ctor: F,
    ) -> &mut Self
    where
        F: Fn(&BuildArgs<'_>) -> Result<IntegratorBuild, BackendError> + Send + Sync + 'static,
    {
        self.integrators
            .insert(operation, FamilyKey::Exact(family), device, Arc::new(ctor));
        self
    }

    /// Register a compute constructor.
    pub fn register_compute<F>(
        &mut self,
        operation: &'static str,
        family: FamilyKey,
        device: DeviceClass,
        ctor: F,
    ) -> &mut Self
    where
        F: Fn(&BuildArgs<'_>) -> Result<ComputeHandle, BackendError> + Send + Sync + 'static,
    {
        self.computes
            .insert(operation, family, device, Arc::new(ctor));
        self
    }

    /// Register an updater constructor.
    pub fn register_updater<F>(
        &mut self,
        operation: &'static str,
        family: FamilyKey,
        device: DeviceClass,
        ctor: F,
    ) -> &mut Self
    where
        F: Fn(&BuildArgs<'_>) -> Result<UpdaterHandle, BackendError> + Send + Sync + 'static,
    {
        self.updaters
            .insert(operation, family, device, Arc::new(ctor));
        self
    }

    /// Resolve an integrator constructor. Integrators always name a family.
    pub fn integrator(
        &self,
        operation: &str,
        family: Family,
        device: DeviceClass,
    ) -> Result<&IntegratorCtor, UnsupportedConfig> {
        let ctor = self.integrators.resolve(operation, Some(family), device)?;
        debug!(operation, %family, %device, "resolved integrator backend");
        Ok(ctor)
    }

    /// Resolve a compute constructor.
    pub fn compute(
        &self,
        operation: &str,
        family: Option<Family>,
        device: DeviceClass,
    ) -> Result<&ComputeCtor, UnsupportedConfig> {
        let ctor = self.computes.resolve(operation, family, device)?;
        debug!(operation, ?family, %device, "resolved compute backend");
        Ok(ctor)
    }

    /// Resolve an updater constructor.
    pub fn updater(
        &self,
        operation: &str,
        family: Option<Family>,
        device: DeviceClass,
    ) -> Result<&UpdaterCtor, UnsupportedConfig> {
        let ctor = self.updaters.resolve(operation, family, device)?;
        debug!(operation, ?family, %device, "resolved updater backend");
        Ok(ctor)
    }

    /// The integrator table.
    pub fn integrators(&self) -> &DispatchTable<IntegratorCtor> {
        &self.integrators
    }

    /// The compute table.
    pub fn computes(&self) -> &DispatchTable<ComputeCtor> {
        &self.computes
    }

    /// The updater table.
    pub fn updaters(&self) -> &DispatchTable<UpdaterCtor> {
        &self.updaters
    }
}

impl fmt::Debug for BackendSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSelector")
            .field("integrators", &self.integrators.len())
            .field("computes", &self.computes.len())
            .field("updaters", &self.updaters.len())
            .finish()
    }
}
