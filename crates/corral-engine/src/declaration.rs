//! Declarative operation descriptions.
//!
//! An [`OperationSpec`] names an operation by kind and type name and
//! carries untyped parameter values, as they arrive from a script or a
//! configuration file. [`OperationSpec::build`] turns it into a typed
//! [`Declared`] operation or rejects it with
//! [`OpError::InvalidArgument`].

use corral_core::{OpError, OperationKind, ParamValue, Period, Shape};
use corral_ops::compute::{FREE_VOLUME, SDF};
use corral_ops::hpmc::HPMC;
use corral_ops::md::MD;
use corral_ops::update::{RESCALE_TEMP, SORT, ZERO_MOMENTUM};
use corral_ops::{
    Declared, FreeVolume, HpmcIntegrator, MdIntegrator, MdMethod, RescaleTemp, Sdf, Sort, Updater,
    ZeroMomentum,
};
use indexmap::IndexMap;

/// Untyped description of one operation.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationSpec {
    /// `"integrator"`, `"compute"` or `"updater"`.
    pub kind: String,
    /// Logical type name, e.g. `"sdf"`.
    pub type_name: String,
    /// Parameter values in application order.
    pub params: Vec<(String, ParamValue)>,
    /// Updater cadence. Only a positive integer is accepted.
    pub period: Option<ParamValue>,
}

impl OperationSpec {
    /// A description with no parameters.
    pub fn new(kind: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            type_name: type_name.into(),
            params: Vec::new(),
            period: None,
        }
    }

    /// Add a parameter value.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Set the updater cadence.
    pub fn every(mut self, period: impl Into<ParamValue>) -> Self {
        self.period = Some(period.into());
        self
    }

    /// Build the typed operation.
    ///
    /// Constructor arguments are taken from `params` by name; whatever
    /// remains is applied with `set_param`. Keys of the form
    /// `diameter[T]` set HPMC per-type diameters.
    ///
    /// An `md` integrator takes at most one `method` here, with its
    /// arguments (`kT`, `tau`, `seed`) as plain keys. Further methods are
    /// added on the typed value with [`MdIntegrator::add_method`]; indexed
    /// keys such as `method[1]` are rejected as unknown parameters.
    pub fn build(&self) -> Result<Declared, OpError> {
        let kind = OperationKind::from_name(&self.kind)
            .ok_or_else(|| OpError::invalid(format!("'{}' is not an operation kind", self.kind)))?;
        let mut args = Args::new(&self.params);

        let mut declared: Declared = match (kind, self.type_name.as_str()) {
            (OperationKind::Integrator, HPMC) => {
                let shape_name = args.take_str("shape")?;
                let shape = Shape::from_name(&shape_name).ok_or_else(|| {
                    OpError::invalid(format!("'{shape_name}' is not a particle shape"))
                })?;
                let seed = args.take_int_or("seed", 0)?;
                let mut hpmc = HpmcIntegrator::new(shape, seed);
                for (type_name, value) in args.take_indexed("diameter") {
                    let d = value.as_float().ok_or_else(|| {
                        OpError::invalid(format!("diameter[{type_name}] must be a number"))
                    })?;
                    hpmc.set_diameter(&type_name, d)?;
                }
                hpmc.into()
            }
            (OperationKind::Integrator, MD) => {
                let dt = args.take_float("dt")?;
                let mut md = MdIntegrator::new(dt)?;
                if let Some(method) = args.take("method") {
                    md.add_method(method_from(&method, &mut args)?)?;
                }
                md.into()
            }
            (OperationKind::Compute, FREE_VOLUME) => {
                let test_type = args.take_str("test_particle_type")?;
                let samples = args.take_int("num_samples")?;
                FreeVolume::new(&test_type, samples).into()
            }
            (OperationKind::Compute, SDF) => {
                let xmax = args.take_float("xmax")?;
                let dx = args.take_float("dx")?;
                Sdf::new(xmax, dx).into()
            }
            (OperationKind::Updater, SORT) => Sort::new().into(),
            (OperationKind::Updater, RESCALE_TEMP) => RescaleTemp::new(args.take_float("kT")?)?.into(),
            (OperationKind::Updater, ZERO_MOMENTUM) => ZeroMomentum::new().into(),
            (kind, other) => {
                return Err(OpError::invalid(format!(
                    "'{other}' is not a recognized {kind} type"
                )))
            }
        };

        for (name, value) in args.rest() {
            declared.set_param(name, value.clone())?;
        }

        match (&mut declared, &self.period) {
            (_, None) => {}
            (Declared::Updater(updater), Some(value)) => {
                updater.set_period(Period::try_from(value.clone())?)?;
            }
            (_, Some(_)) => {
                return Err(OpError::invalid(format!(
                    "'{}' is not an updater and takes no period",
                    self.type_name
                )))
            }
        }
        Ok(declared)
    }
}

fn method_from(name: &ParamValue, args: &mut Args<'_>) -> Result<MdMethod, OpError> {
    match name.as_str() {
        Some("nve") => Ok(MdMethod::Nve),
        Some("nvt") => Ok(MdMethod::Nvt {
            kt: args.take_float("kT")?,
            tau: args.take_float("tau")?,
        }),
        Some("langevin") => Ok(MdMethod::Langevin {
            kt: args.take_float("kT")?,
            seed: args.take_int_or("seed", 0)?,
        }),
        _ => Err(OpError::invalid(format!("{name} is not an MD integration method"))),
    }
}

/// Named arguments, consumed by constructors.
struct Args<'a> {
    values: IndexMap<&'a str, &'a ParamValue>,
}

impl<'a> Args<'a> {
    fn new(params: &'a [(String, ParamValue)]) -> Self {
        Self {
            values: params.iter().map(|(k, v)| (k.as_str(), v)).collect(),
        }
    }

    fn take(&mut self, name: &str) -> Option<ParamValue> {
        self.values.shift_remove(name).cloned()
    }

    fn required(&mut self, name: &str) -> Result<ParamValue, OpError> {
        self.take(name)
            .ok_or_else(|| OpError::invalid(format!("missing required argument '{name}'")))
    }

    fn take_str(&mut self, name: &str) -> Result<String, OpError> {
        match self.required(name)? {
            ParamValue::Str(s) => Ok(s),
            other => Err(OpError::invalid(format!("'{name}' must be a string, got {other}"))),
        }
    }

    fn take_float(&mut self, name: &str) -> Result<f64, OpError> {
        let value = self.required(name)?;
        value
            .as_float()
            .ok_or_else(|| OpError::invalid(format!("'{name}' must be a number, got {value}")))
    }

    fn take_int(&mut self, name: &str) -> Result<i64, OpError> {
        let value = self.required(name)?;
        value
            .as_int()
            .ok_or_else(|| OpError::invalid(format!("'{name}' must be an integer, got {value}")))
    }

    fn take_int_or(&mut self, name: &str, default: i64) -> Result<i64, OpError> {
        if self.values.contains_key(name) {
            self.take_int(name)
        } else {
            Ok(default)
        }
    }

    /// Remove every `prefix[index]` key, returning `(index, value)` pairs.
    fn take_indexed(&mut self, prefix: &str) -> Vec<(String, ParamValue)> {
        let keys: Vec<&'a str> = self
            .values
            .keys()
            .copied()
            .filter(|k| {
                k.strip_prefix(prefix)
                    .and_then(|rest| rest.strip_prefix('['))
                    .is_some_and(|rest| rest.ends_with(']'))
            })
            .collect();
        keys.into_iter()
            .filter_map(|k| {
                let value = self.values.shift_remove(k)?;
                let index = &k[prefix.len() + 1..k.len() - 1];
                Some((index.to_string(), value.clone()))
            })
            .collect()
    }

    fn rest(&self) -> impl Iterator<Item = (&'a str, &'a ParamValue)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_core::{ParamError, ParamKind};
    use corral_ops::Operation;

    #[test]
    fn unknown_kind_is_invalid_argument() {
        let err = OperationSpec::new("analyzer", "log").build().unwrap_err();
        assert!(matches!(err, OpError::InvalidArgument { .. }), "{err}");
    }

    #[test]
    fn unknown_type_is_invalid_argument() {
        let err = OperationSpec::new("compute", "msd").build().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument: 'msd' is not a recognized compute type"
        );
        let err = OperationSpec::new("updater", "sdf").build().unwrap_err();
        assert!(matches!(err, OpError::InvalidArgument { .. }));
    }

    #[test]
    fn hpmc_with_diameters_and_live_overrides() {
        let declared = OperationSpec::new("integrator", "hpmc")
            .param("shape", "sphere")
            .param("seed", 42)
            .param("diameter[A]", 1.0)
            .param("d", 0.25)
            .build()
            .unwrap();
        let Declared::Integrator(op) = declared else {
            panic!("expected an integrator");
        };
        assert_eq!(op.params().float("d").unwrap(), 0.25);
        assert_eq!(op.params().int("seed").unwrap(), 42);
    }

    #[test]
    fn md_method_from_arguments() {
        let declared = OperationSpec::new("integrator", "md")
            .param("dt", 0.005)
            .param("method", "nvt")
            .param("kT", 1.0)
            .param("tau", 0.5)
            .build()
            .unwrap();
        assert_eq!(declared.kind(), OperationKind::Integrator);
        assert_eq!(declared.type_name(), "md");
    }

    #[test]
    fn leftover_keys_are_validated() {
        let err = OperationSpec::new("compute", "sdf")
            .param("xmax", 0.02)
            .param("dx", 1e-4)
            .param("bins", 7)
            .build()
            .unwrap_err();
        assert_eq!(err, OpError::Param(ParamError::UnknownKey { name: "bins".into() }));

        let err = OperationSpec::new("updater", "rescale_temp")
            .param("kT", "hot")
            .build()
            .unwrap_err();
        assert!(matches!(err, OpError::InvalidArgument { .. }));

        let err = OperationSpec::new("updater", "sort")
            .param("bin_width", "wide")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            OpError::Param(ParamError::KindMismatch {
                name: "bin_width".into(),
                expected: ParamKind::Float,
                found: ParamKind::Str,
            })
        );
    }

    #[test]
    fn period_only_for_updaters_and_only_positive_integers() {
        let Declared::Updater(sort) = OperationSpec::new("updater", "sort").every(10).build().unwrap()
        else {
            panic!("expected an updater");
        };
        assert_eq!(sort.period().unwrap().fixed(), Some(10));

        let err = OperationSpec::new("updater", "sort")
            .every("often")
            .build()
            .unwrap_err();
        assert!(matches!(err, OpError::InvalidArgument { .. }));

        let err = OperationSpec::new("compute", "sdf")
            .param("xmax", 0.02)
            .param("dx", 1e-4)
            .every(5)
            .build()
            .unwrap_err();
        assert!(matches!(err, OpError::InvalidArgument { .. }));
    }

    #[test]
    fn negative_constructor_values_are_rejected() {
        let err = OperationSpec::new("updater", "rescale_temp")
            .param("kT", -2.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, OpError::InvalidArgument { .. }), "{err}");

        let err = OperationSpec::new("integrator", "md")
            .param("dt", -0.5)
            .build()
            .unwrap_err();
        assert!(matches!(err, OpError::InvalidArgument { .. }), "{err}");

        assert!(OperationSpec::new("updater", "sort")
            .param("bin_width", -1.0)
            .build()
            .is_err());
    }

    #[test]
    fn md_takes_a_single_method() {
        let err = OperationSpec::new("integrator", "md")
            .param("dt", 0.005)
            .param("method", "nve")
            .param("method[1]", "langevin")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            OpError::Param(ParamError::UnknownKey {
                name: "method[1]".into()
            })
        );
    }
}
