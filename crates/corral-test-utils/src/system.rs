//! Recording mock of the native system.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use corral_backend::{
    IntegratorHandle, NativeIntegrator, NativeObject, NativeSystem, NativeUpdater, UpdaterHandle,
};
use corral_core::{BackendError, Family, Period, Timestep};
use indexmap::IndexMap;

/// One directive received by [`MockSystem`].
#[derive(Clone, Debug, PartialEq)]
pub enum SystemCall {
    SetActiveIntegrator(String),
    ClearActiveIntegrator,
    Register { name: String, period: Period },
    Deregister(String),
    SetPeriod { name: String, period: Period },
    GetPeriod(String),
}

#[derive(Default)]
struct Inner {
    calls: Vec<SystemCall>,
    periodic: IndexMap<String, (UpdaterHandle, Period)>,
    active: Option<IntegratorHandle>,
    reject_registrations: bool,
}

/// In-memory execution loop that records every directive it receives.
///
/// Registering a name twice or touching an unregistered name is a
/// [`BackendError`], which makes protocol mistakes visible in tests.
#[derive(Default)]
pub struct MockSystem {
    inner: Mutex<Inner>,
}

impl MockSystem {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every directive so far, in order.
    pub fn calls(&self) -> Vec<SystemCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Names currently registered, in registration order.
    pub fn registered(&self) -> Vec<String> {
        self.lock().periodic.keys().cloned().collect()
    }

    /// Period of a registered updater, without recording a call.
    pub fn registered_period(&self, name: &str) -> Option<Period> {
        self.lock().periodic.get(name).map(|(_, p)| p.clone())
    }

    /// Label of the installed integrator.
    pub fn active_integrator(&self) -> Option<String> {
        self.lock().active.as_ref().map(|h| h.label().to_string())
    }

    /// Family of the installed integrator.
    pub fn active_family(&self) -> Option<Family> {
        self.lock().active.as_ref().map(|h| h.family())
    }

    /// Make subsequent `register_periodic` calls fail.
    pub fn reject_registrations(&self, reject: bool) {
        self.lock().reject_registrations = reject;
    }

    /// Run one step of the execution loop: every registered updater with a
    /// fixed period dividing `step` (or any variable-period updater) runs.
    /// Returns how many ran.
    pub fn run(&self, step: Timestep) -> Result<usize, BackendError> {
        let due: Vec<UpdaterHandle> = self
            .lock()
            .periodic
            .values()
            .filter(|(_, period)| match period.fixed() {
                Some(n) => step.0 % n == 0,
                None => true,
            })
            .map(|(h, _)| h.clone())
            .collect();
        for updater in &due {
            updater.update(step)?;
        }
        Ok(due.len())
    }
}

impl NativeSystem for MockSystem {
    fn set_active_integrator(&self, integrator: IntegratorHandle) -> Result<(), BackendError> {
        let mut inner = self.lock();
        inner
            .calls
            .push(SystemCall::SetActiveIntegrator(integrator.label().to_string()));
        inner.active = Some(integrator);
        Ok(())
    }

    fn clear_active_integrator(&self) -> Result<(), BackendError> {
        let mut inner = self.lock();
        inner.calls.push(SystemCall::ClearActiveIntegrator);
        inner.active = None;
        Ok(())
    }

    fn register_periodic(
        &self,
        updater: UpdaterHandle,
        name: &str,
        period: Period,
    ) -> Result<(), BackendError> {
        let mut inner = self.lock();
        inner.calls.push(SystemCall::Register {
            name: name.to_string(),
            period: period.clone(),
        });
        if inner.reject_registrations {
            return Err(BackendError::new("MockSystem", "registration rejected"));
        }
        if inner.periodic.contains_key(name) {
            return Err(BackendError::new(
                "MockSystem",
                format!("'{name}' is already registered"),
            ));
        }
        inner.periodic.insert(name.to_string(), (updater, period));
        Ok(())
    }

    fn deregister_periodic(&self, name: &str) -> Result<(), BackendError> {
        let mut inner = self.lock();
        inner.calls.push(SystemCall::Deregister(name.to_string()));
        inner
            .periodic
            .shift_remove(name)
            .map(|_| ())
            .ok_or_else(|| BackendError::new("MockSystem", format!("'{name}' is not registered")))
    }

    fn set_period(&self, name: &str, period: Period) -> Result<(), BackendError> {
        let mut inner = self.lock();
        inner.calls.push(SystemCall::SetPeriod {
            name: name.to_string(),
            period: period.clone(),
        });
        match inner.periodic.get_mut(name) {
            Some(entry) => {
                entry.1 = period;
                Ok(())
            }
            None => Err(BackendError::new(
                "MockSystem",
                format!("'{name}' is not registered"),
            )),
        }
    }

    fn get_period(&self, name: &str) -> Result<Period, BackendError> {
        let mut inner = self.lock();
        inner.calls.push(SystemCall::GetPeriod(name.to_string()));
        inner
            .periodic
            .get(name)
            .map(|(_, p)| p.clone())
            .ok_or_else(|| BackendError::new("MockSystem", format!("'{name}' is not registered")))
    }
}
