//! Mock native objects and a populated mock selector.
//!
//! [`mock_selector`] registers constructors the way a real backend would:
//!
//! | operation | families | host | accelerator |
//! |-----------|----------|------|-------------|
//! | `hpmc` | sphere, ellipsoid, convex polyhedron | yes | yes |
//! | `md` | md | yes | yes |
//! | `free_volume` | the hpmc shapes above | yes | yes |
//! | `sdf` | the hpmc shapes above | yes | no |
//! | `sort` | any | yes | yes |
//! | `rescale_temp` | any | yes | no |
//! | `zero_momentum` | any | yes | yes |

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use corral_backend::{
    BackendSelector, BuildArgs, ComputeHandle, FamilyKey, IntegratorBuild, IntegratorHandle,
    NativeCompute, NativeIntegrator, NativeObject, NativeUpdater, Property, UpdaterHandle,
};
use corral_core::{BackendError, DeviceClass, Family, ParamValue, ParameterDict, Shape, Timestep};
use indexmap::IndexMap;

/// Shapes the mock backend implements.
pub const MOCK_SHAPES: [Shape; 3] = [Shape::Sphere, Shape::Ellipsoid, Shape::ConvexPolyhedron];

const DEVICES: [DeviceClass; 2] = [DeviceClass::Host, DeviceClass::Accelerator];

fn suffix(device: DeviceClass) -> &'static str {
    match device {
        DeviceClass::Host => "",
        DeviceClass::Accelerator => "GPU",
    }
}

fn camel(name: &str) -> String {
    name.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[derive(Default)]
struct Pushes(Mutex<Vec<(String, ParamValue)>>);

impl Pushes {
    fn record(&self, name: &str, value: &ParamValue) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_string(), value.clone()));
    }

    fn snapshot(&self) -> Vec<(String, ParamValue)> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

// ── MockIntegrator ─────────────────────────────────────────────────

pub struct MockIntegrator {
    label: String,
    family: Family,
    pushes: Pushes,
}

impl MockIntegrator {
    pub fn new(label: impl Into<String>, family: Family) -> Self {
        Self {
            label: label.into(),
            family,
            pushes: Pushes::default(),
        }
    }

    /// Live parameter pushes received so far.
    pub fn pushes(&self) -> Vec<(String, ParamValue)> {
        self.pushes.snapshot()
    }
}

impl NativeObject for MockIntegrator {
    fn label(&self) -> &str {
        &self.label
    }

    fn set_param(&self, name: &str, value: &ParamValue) -> Result<(), BackendError> {
        self.pushes.record(name, value);
        Ok(())
    }
}

impl NativeIntegrator for MockIntegrator {
    fn family(&self) -> Family {
        self.family
    }
}

// ── MockCompute ────────────────────────────────────────────────────

/// A compute that serves fixed property values once evaluated.
pub struct MockCompute {
    label: String,
    properties: IndexMap<&'static str, Property>,
    evaluations: AtomicUsize,
    last_step: Mutex<Option<Timestep>>,
    pushes: Pushes,
}

impl MockCompute {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            properties: IndexMap::new(),
            evaluations: AtomicUsize::new(0),
            last_step: Mutex::new(None),
            pushes: Pushes::default(),
        }
    }

    pub fn with_property(mut self, name: &'static str, value: Property) -> Self {
        self.properties.insert(name, value);
        self
    }

    /// How many times [`NativeCompute::compute`] ran.
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    pub fn last_step(&self) -> Option<Timestep> {
        *self.last_step.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn pushes(&self) -> Vec<(String, ParamValue)> {
        self.pushes.snapshot()
    }
}

impl NativeObject for MockCompute {
    fn label(&self) -> &str {
        &self.label
    }

    fn set_param(&self, name: &str, value: &ParamValue) -> Result<(), BackendError> {
        self.pushes.record(name, value);
        Ok(())
    }
}

impl NativeCompute for MockCompute {
    fn compute(&self, step: Timestep) -> Result<(), BackendError> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        *self.last_step.lock().unwrap_or_else(PoisonError::into_inner) = Some(step);
        Ok(())
    }

    fn property(&self, name: &str) -> Option<Property> {
        if self.evaluations() == 0 {
            return None;
        }
        self.properties.get(name).cloned()
    }
}

// ── MockUpdater ────────────────────────────────────────────────────

pub struct MockUpdater {
    label: String,
    updates: Mutex<Vec<Timestep>>,
    pushes: Pushes,
}

impl MockUpdater {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            updates: Mutex::new(Vec::new()),
            pushes: Pushes::default(),
        }
    }

    /// Steps at which [`NativeUpdater::update`] ran.
    pub fn updates(&self) -> Vec<Timestep> {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn pushes(&self) -> Vec<(String, ParamValue)> {
        self.pushes.snapshot()
    }
}

impl NativeObject for MockUpdater {
    fn label(&self) -> &str {
        &self.label
    }

    fn set_param(&self, name: &str, value: &ParamValue) -> Result<(), BackendError> {
        self.pushes.record(name, value);
        Ok(())
    }
}

impl NativeUpdater for MockUpdater {
    fn update(&self, step: Timestep) -> Result<(), BackendError> {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(step);
        Ok(())
    }
}

// ── Selector ───────────────────────────────────────────────────────

/// Counts native objects built by [`mock_selector`] constructors.
#[derive(Clone, Debug, Default)]
pub struct Constructions(Arc<AtomicUsize>);

impl Constructions {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

fn thermo_for(child: &ParameterDict, index: usize) -> Option<ComputeHandle> {
    let method = child.str("method").ok()?;
    if method == "nve" {
        return None;
    }
    let kt = child.float("kT").ok()?;
    let compute = MockCompute::new(format!("ComputeThermo{index}"))
        .with_property("kinetic_temperature", Property::Scalar(kt));
    Some(Arc::new(compute))
}

/// A selector populated with mock constructors, plus a counter of every
/// native object they build.
pub fn mock_selector() -> (BackendSelector, Constructions) {
    let counter = Constructions::default();
    let mut selector = BackendSelector::new();

    for device in DEVICES {
        for shape in MOCK_SHAPES {
            let family = Family::Hpmc(shape);
            let c = counter.clone();
            selector.register_integrator("hpmc", family, device, move |_args: &BuildArgs<'_>| {
                c.bump();
                let label = format!("IntegratorHPMCMono{}{}", camel(shape.name()), suffix(device));
                Ok(IntegratorBuild::bare(Arc::new(MockIntegrator::new(label, family))))
            });

            let c = counter.clone();
            selector.register_compute(
                "free_volume",
                FamilyKey::Exact(family),
                device,
                move |args: &BuildArgs<'_>| {
                    c.bump();
                    let volume = args.context.state().sim_box().volume();
                    let label = format!("ComputeFreeVolume{}{}", camel(shape.name()), suffix(device));
                    let compute =
                        MockCompute::new(label).with_property("free_volume", Property::Scalar(volume));
                    Ok(Arc::new(compute) as ComputeHandle)
                },
            );

            if device == DeviceClass::Host {
                let c = counter.clone();
                selector.register_compute(
                    "sdf",
                    FamilyKey::Exact(family),
                    device,
                    move |args: &BuildArgs<'_>| {
                        c.bump();
                        let xmax = args.params.float("xmax").map_err(|e| {
                            BackendError::new("ComputeSDF", e.to_string())
                        })?;
                        let dx = args
                            .params
                            .float("dx")
                            .map_err(|e| BackendError::new("ComputeSDF", e.to_string()))?;
                        let bins = (xmax / dx).ceil() as usize;
                        let label = format!("ComputeSDF{}", camel(shape.name()));
                        let compute = MockCompute::new(label)
                            .with_property("sdf", Property::Series(vec![0.0; bins]));
                        Ok(Arc::new(compute) as ComputeHandle)
                    },
                );
            }
        }

        let c = counter.clone();
        selector.register_integrator("md", Family::Md, device, move |args: &BuildArgs<'_>| {
            c.bump();
            let handle: IntegratorHandle = Arc::new(MockIntegrator::new(
                format!("IntegratorTwoStep{}", suffix(device)),
                Family::Md,
            ));
            let auxiliary = args
                .children
                .iter()
                .enumerate()
                .filter_map(|(i, child)| thermo_for(child, i))
                .collect();
            Ok(IntegratorBuild { handle, auxiliary })
        });

        let mut updaters = vec!["sort", "zero_momentum"];
        if device == DeviceClass::Host {
            updaters.push("rescale_temp");
        }
        for op in updaters {
            let c = counter.clone();
            selector.register_updater(op, FamilyKey::Any, device, move |_args: &BuildArgs<'_>| {
                c.bump();
                let label = format!("{}{}", camel(op), suffix(device));
                Ok(Arc::new(MockUpdater::new(label)) as UpdaterHandle)
            });
        }
    }

    (selector, counter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_labels() {
        assert_eq!(camel("convex_polyhedron"), "ConvexPolyhedron");
        assert_eq!(camel("sort"), "Sort");
    }

    #[test]
    fn selector_coverage_matches_table() {
        let (selector, counter) = mock_selector();
        let sphere = Some(Family::Hpmc(Shape::Sphere));
        assert!(selector.computes().supports("sdf", sphere, DeviceClass::Host));
        assert!(!selector.computes().supports("sdf", sphere, DeviceClass::Accelerator));
        assert!(selector
            .computes()
            .supports("free_volume", sphere, DeviceClass::Accelerator));
        assert!(!selector.updaters().supports("rescale_temp", None, DeviceClass::Accelerator));
        assert!(selector.updaters().supports("sort", Some(Family::Md), DeviceClass::Host));
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn uncomputed_property_is_absent() {
        let c = MockCompute::new("C").with_property("x", Property::Scalar(1.0));
        assert_eq!(c.property("x"), None);
        c.compute(Timestep(3)).unwrap();
        assert_eq!(c.property("x"), Some(Property::Scalar(1.0)));
        assert_eq!(c.last_step(), Some(Timestep(3)));
    }
}
