//! Integrator families.
//!
//! A [`Family`] is the algorithmic identity of the active integrator. It is
//! the second axis of backend dispatch: computes such as free-volume
//! sampling have one native implementation per hard-particle shape.

use std::fmt;

/// Hard-particle shape classes supported by Monte Carlo integration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Shape {
    /// Spheres (disks in 2D).
    Sphere,
    /// Ellipsoids (ellipses in 2D).
    Ellipsoid,
    /// Convex polygons (2D only).
    ConvexPolygon,
    /// Convex polyhedra.
    ConvexPolyhedron,
    /// Rigid unions of spheres.
    SphereUnion,
    /// Spheres intersected with planes.
    FacetedSphere,
}

impl Shape {
    /// Every shape, in declaration order.
    pub const ALL: [Shape; 6] = [
        Shape::Sphere,
        Shape::Ellipsoid,
        Shape::ConvexPolygon,
        Shape::ConvexPolyhedron,
        Shape::SphereUnion,
        Shape::FacetedSphere,
    ];

    /// Snake-case name used in declarative specs and logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sphere => "sphere",
            Self::Ellipsoid => "ellipsoid",
            Self::ConvexPolygon => "convex_polygon",
            Self::ConvexPolyhedron => "convex_polyhedron",
            Self::SphereUnion => "sphere_union",
            Self::FacetedSphere => "faceted_sphere",
        }
    }

    /// Inverse of [`name`](Self::name).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Broad integrator category a compute can require.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FamilyClass {
    /// Any hard-particle Monte Carlo integrator, regardless of shape.
    Hpmc,
    /// Molecular dynamics.
    Md,
}

impl fmt::Display for FamilyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hpmc => f.write_str("hpmc"),
            Self::Md => f.write_str("md"),
        }
    }
}

/// The exact algorithm family of an integrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    /// Hard-particle Monte Carlo for one shape class.
    Hpmc(Shape),
    /// Molecular dynamics.
    Md,
}

impl Family {
    /// The broad category this family belongs to.
    pub fn class(self) -> FamilyClass {
        match self {
            Self::Hpmc(_) => FamilyClass::Hpmc,
            Self::Md => FamilyClass::Md,
        }
    }

    /// Whether this family satisfies a class requirement.
    pub fn is(self, class: FamilyClass) -> bool {
        self.class() == class
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hpmc(shape) => write!(f, "hpmc:{shape}"),
            Self::Md => f.write_str("md"),
        }
    }
}
