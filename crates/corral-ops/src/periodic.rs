//! Periodic scheduler interface for updaters.
//!
//! [`PeriodicControl`] is the only place an updater's schedule record is
//! mutated. It issues register / deregister / period directives to the
//! [`NativeSystem`]; the execution loop's timer itself lives below that
//! trait.
//!
//! The record keeps the last known period while the updater is disabled,
//! so re-enabling restores the exact cadence (including the identity of a
//! variable-period function) without asking the backend.

use std::sync::Arc;

use corral_backend::{NativeSystem, UpdaterHandle};
use corral_core::{OpError, Period, StateMisuse};
use tracing::{debug, info, warn};

/// Cadence and enabled flag of one updater.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdaterSchedule {
    /// Last period configured or read back from the backend.
    pub period: Period,
    /// Whether the updater should be registered with the execution loop.
    pub enabled: bool,
}

/// Outcome of [`enable`](PeriodicControl::enable) and
/// [`disable`](PeriodicControl::disable).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    /// The state changed.
    Applied,
    /// The call was redundant; nothing changed and a warning was logged.
    Ignored(StateMisuse),
}

impl Toggle {
    /// Whether the call changed state.
    pub fn applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

struct Binding {
    system: Arc<dyn NativeSystem>,
    updater: UpdaterHandle,
}

/// Schedule record plus, while attached, the binding to the execution loop.
pub struct PeriodicControl {
    name: String,
    schedule: UpdaterSchedule,
    binding: Option<Binding>,
}

impl PeriodicControl {
    /// An enabled, unbound control with the given default period.
    pub fn new(name: impl Into<String>, period: Period) -> Self {
        Self {
            name: name.into(),
            schedule: UpdaterSchedule {
                period,
                enabled: true,
            },
            binding: None,
        }
    }

    /// Name the updater is registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schedule record.
    pub fn schedule(&self) -> &UpdaterSchedule {
        &self.schedule
    }

    /// Whether the record says enabled.
    pub fn is_enabled(&self) -> bool {
        self.schedule.enabled
    }

    /// Whether an attached updater is bound.
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Bind a freshly attached updater, registering it with the execution
    /// loop if the record says enabled. On failure nothing is bound.
    pub fn bind(
        &mut self,
        system: Arc<dyn NativeSystem>,
        updater: UpdaterHandle,
        name: String,
    ) -> Result<(), OpError> {
        self.unbind()?;
        if self.schedule.enabled {
            system.register_periodic(updater.clone(), &name, self.schedule.period.clone())?;
            info!(updater = %name, period = %self.schedule.period, "registered with execution loop");
        }
        self.name = name;
        self.binding = Some(Binding { system, updater });
        Ok(())
    }

    /// Release the binding, deregistering first if enabled. The backend's
    /// current period is recorded before deregistration.
    pub fn unbind(&mut self) -> Result<(), OpError> {
        let Some(binding) = &self.binding else {
            return Ok(());
        };
        if self.schedule.enabled {
            let period = binding.system.get_period(&self.name)?;
            binding.system.deregister_periodic(&self.name)?;
            self.schedule.period = period;
            info!(updater = %self.name, "deregistered from execution loop");
        }
        self.binding = None;
        Ok(())
    }

    /// Register with the execution loop using the recorded period.
    pub fn enable(&mut self) -> Result<Toggle, OpError> {
        let binding = self.bound()?;
        if self.schedule.enabled {
            return Ok(self.misuse(StateMisuse::AlreadyEnabled));
        }
        binding.system.register_periodic(
            binding.updater.clone(),
            &self.name,
            self.schedule.period.clone(),
        )?;
        self.schedule.enabled = true;
        info!(updater = %self.name, period = %self.schedule.period, "enabled");
        Ok(Toggle::Applied)
    }

    /// Record the backend's current period, then deregister.
    pub fn disable(&mut self) -> Result<Toggle, OpError> {
        let binding = self.bound()?;
        if !self.schedule.enabled {
            return Ok(self.misuse(StateMisuse::AlreadyDisabled));
        }
        let period = binding.system.get_period(&self.name)?;
        binding.system.deregister_periodic(&self.name)?;
        self.schedule.period = period;
        self.schedule.enabled = false;
        info!(updater = %self.name, "disabled");
        Ok(Toggle::Applied)
    }

    /// Change the cadence.
    ///
    /// Pushed to the backend only while bound and enabled; otherwise only
    /// the record changes and the next registration picks it up.
    pub fn set_period(&mut self, period: Period) -> Result<(), OpError> {
        if let Some(binding) = &self.binding {
            if self.schedule.enabled {
                binding.system.set_period(&self.name, period.clone())?;
            }
        }
        debug!(updater = %self.name, %period, "period set");
        self.schedule.period = period;
        Ok(())
    }

    /// Current cadence: the backend's value while registered, the recorded
    /// value otherwise.
    pub fn period(&self) -> Result<Period, OpError> {
        match &self.binding {
            Some(binding) if self.schedule.enabled => Ok(binding.system.get_period(&self.name)?),
            _ => Ok(self.schedule.period.clone()),
        }
    }

    fn bound(&self) -> Result<&Binding, OpError> {
        self.binding.as_ref().ok_or_else(|| OpError::NotAttached {
            name: self.name.clone(),
        })
    }

    fn misuse(&self, misuse: StateMisuse) -> Toggle {
        warn!(updater = %self.name, "{misuse}; call ignored");
        Toggle::Ignored(misuse)
    }
}

impl std::fmt::Debug for PeriodicControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicControl")
            .field("name", &self.name)
            .field("schedule", &self.schedule)
            .field("bound", &self.is_bound())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_test_utils::{MockSystem, MockUpdater, SystemCall};
    use proptest::prelude::*;

    fn every(n: u64) -> Period {
        Period::every(n).unwrap()
    }

    fn bound(period: Period) -> (PeriodicControl, Arc<MockSystem>) {
        let system = MockSystem::new();
        let mut control = PeriodicControl::new("sort", period);
        control
            .bind(system.clone(), Arc::new(MockUpdater::new("Sort")), "sort#1".into())
            .unwrap();
        (control, system)
    }

    #[test]
    fn bind_registers_when_enabled() {
        let (control, system) = bound(every(500));
        assert!(control.is_bound());
        assert_eq!(control.name(), "sort#1");
        assert_eq!(system.registered_period("sort#1"), Some(every(500)));
    }

    #[test]
    fn bind_while_disabled_registers_nothing() {
        let system = MockSystem::new();
        let mut control = PeriodicControl::new("sort", every(5));
        control.schedule.enabled = false;
        control
            .bind(system.clone(), Arc::new(MockUpdater::new("Sort")), "sort#1".into())
            .unwrap();
        assert!(system.calls().is_empty());
        assert_eq!(control.period().unwrap(), every(5));
    }

    #[test]
    fn unbind_reads_period_then_deregisters() {
        let (mut control, system) = bound(every(500));
        system.clear_calls();
        control.unbind().unwrap();
        assert_eq!(
            system.calls(),
            vec![
                SystemCall::GetPeriod("sort#1".into()),
                SystemCall::Deregister("sort#1".into()),
            ]
        );
        assert!(!control.is_bound());
        // Unbinding twice is a no-op.
        control.unbind().unwrap();
    }

    #[test]
    fn unbound_toggles_are_not_attached() {
        let mut control = PeriodicControl::new("zero_momentum", every(1));
        assert_eq!(
            control.enable().unwrap_err(),
            OpError::NotAttached {
                name: "zero_momentum".into()
            }
        );
        assert!(control.disable().is_err());
    }

    #[test]
    fn misuse_is_ignored() {
        let (mut control, _system) = bound(every(2));
        assert_eq!(
            control.enable().unwrap(),
            Toggle::Ignored(StateMisuse::AlreadyEnabled)
        );
        assert!(control.disable().unwrap().applied());
        assert!(!control.disable().unwrap().applied());
    }

    proptest! {
        #[test]
        fn disable_enable_restores_period(
            initial in 1u64..1000,
            changes in prop::collection::vec(1u64..1000, 0..6),
        ) {
            let (mut control, system) = bound(every(initial));
            let mut expected = every(initial);
            for (i, n) in changes.iter().enumerate() {
                if i % 2 == 0 {
                    control.disable().unwrap();
                    control.set_period(every(*n)).unwrap();
                    control.enable().unwrap();
                } else {
                    control.set_period(every(*n)).unwrap();
                }
                expected = every(*n);
            }
            prop_assert!(control.disable().unwrap().applied());
            prop_assert_eq!(&control.schedule().period, &expected);
            prop_assert!(control.enable().unwrap().applied());
            prop_assert_eq!(system.registered_period("sort#1"), Some(expected));
        }
    }
}
