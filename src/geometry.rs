//! Geometric utility objects.

use crate::num::BFloat;
use num;
use std::{
    fmt,
    ops::{Add, Index, IndexMut, Mul, Sub},
};

#[cfg(feature = "serialization")]
use serde::Serialize;

/// Denotes the x-, y- or z-dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dim3 {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Dim3 {
    /// Creates an array for iterating over the x-, y- and z-dimensions.
    pub fn slice() -> [Self; 3] {
        [Self::X, Self::Y, Self::Z]
    }

    /// Returns the number of the dimension.
    pub fn num(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Dim3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::X => "x",
                Self::Y => "y",
                Self::Z => "z",
            }
        )
    }
}

use Dim3::{X, Y, Z};

/// Represents any quantity with three dimensional components.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct In3D<T>([T; 3]);

impl<T> In3D<T> {
    /// Creates a new 3D quantity given the three components.
    pub fn new(x: T, y: T, z: T) -> Self {
        Self([x, y, z])
    }

    /// Creates a new 3D quantity by evaluating the given component
    /// constructor for each dimension.
    pub fn with_each_component<C>(create_component: C) -> Self
    where
        C: Fn(Dim3) -> T,
    {
        Self::new(
            create_component(X),
            create_component(Y),
            create_component(Z),
        )
    }

    /// Creates a new 3D quantity with the given value copied into all components.
    pub fn same(a: T) -> Self
    where
        T: Copy,
    {
        Self([a, a, a])
    }

    /// Creates a new tuple containing copies of the three components.
    pub fn to_tuple(&self) -> (T, T, T)
    where
        T: Copy,
    {
        (self[X], self[Y], self[Z])
    }
}

impl In3D<usize> {
    /// Total number of elements in a lattice with this shape.
    pub fn volume(&self) -> usize {
        self[X] * self[Y] * self[Z]
    }
}

impl<T> Index<Dim3> for In3D<T> {
    type Output = T;
    fn index(&self, dim: Dim3) -> &Self::Output {
        &self.0[dim as usize]
    }
}

impl<T> IndexMut<Dim3> for In3D<T> {
    fn index_mut(&mut self, dim: Dim3) -> &mut Self::Output {
        &mut self.0[dim as usize]
    }
}

impl<'a, T> IntoIterator for &'a In3D<T> {
    type Item = &'a T;
    type IntoIter = ::std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<T: fmt::Display> fmt::Display for In3D<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        fmt::Display::fmt(&self[X], f)?;
        f.write_str(", ")?;
        fmt::Display::fmt(&self[Y], f)?;
        f.write_str(", ")?;
        fmt::Display::fmt(&self[Z], f)?;
        f.write_str("]")
    }
}

/// A 3D vector.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct Vec3<F>(In3D<F>);

impl<F: BFloat> Vec3<F> {
    /// Creates a new 3D vector given the three components.
    pub fn new(x: F, y: F, z: F) -> Self {
        Self(In3D::new(x, y, z))
    }

    /// Creates a new 3D vector by evaluating the given component
    /// constructor for each dimension.
    pub fn with_each_component<C>(create_component: C) -> Self
    where
        C: Fn(Dim3) -> F,
    {
        Self(In3D::with_each_component(create_component))
    }

    /// Creates a new zero vector.
    pub fn zero() -> Self {
        Self::new(F::zero(), F::zero(), F::zero())
    }

    /// Creates a new vector from the given vector, which may have a different component type.
    pub fn from<U: BFloat>(other: &Vec3<U>) -> Self {
        Self::with_each_component(|dim| crate::num::cast_float(other[dim]))
    }

    /// Computes the squared length of the vector.
    pub fn squared_length(&self) -> F {
        self[X] * self[X] + self[Y] * self[Y] + self[Z] * self[Z]
    }

    /// Computes the length of the vector.
    pub fn length(&self) -> F {
        self.squared_length().sqrt()
    }

    /// Whether the vector is the zero vector.
    pub fn is_zero(&self) -> bool {
        self[X] == F::zero() && self[Y] == F::zero() && self[Z] == F::zero()
    }

    /// Whether all components are finite.
    pub fn is_finite(&self) -> bool {
        self[X].is_finite() && self[Y].is_finite() && self[Z].is_finite()
    }

    /// Computes the dot product of the vector with another vector.
    pub fn dot(&self, other: &Self) -> F {
        self[X] * other[X] + self[Y] * other[Y] + self[Z] * other[Z]
    }
}

impl<F: BFloat> Index<Dim3> for Vec3<F> {
    type Output = F;
    fn index(&self, dim: Dim3) -> &Self::Output {
        &self.0[dim]
    }
}

impl<F: BFloat> IndexMut<Dim3> for Vec3<F> {
    fn index_mut(&mut self, dim: Dim3) -> &mut Self::Output {
        &mut self.0[dim]
    }
}

impl<F: BFloat> Mul<F> for &Vec3<F> {
    type Output = Vec3<F>;
    fn mul(self, factor: F) -> Self::Output {
        Vec3::new(self[X] * factor, self[Y] * factor, self[Z] * factor)
    }
}

impl<F: BFloat> Mul<F> for Vec3<F> {
    type Output = Vec3<F>;
    fn mul(self, factor: F) -> Self::Output {
        &self * factor
    }
}

impl<F: BFloat + fmt::Display> fmt::Display for Vec3<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vec3{}", self.0)
    }
}

/// A 3D spatial coordinate.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct Point3<F>(In3D<F>);

impl<F: BFloat> Point3<F> {
    /// Creates a new 3D point given the three components.
    pub fn new(x: F, y: F, z: F) -> Self {
        Self(In3D::new(x, y, z))
    }

    /// Creates a new 3D point by evaluating the given component
    /// constructor for each dimension.
    pub fn with_each_component<C>(create_component: C) -> Self
    where
        C: Fn(Dim3) -> F,
    {
        Self(In3D::with_each_component(create_component))
    }

    /// Creates a new 3D point with all components set to zero.
    pub fn origin() -> Self {
        Self::new(F::zero(), F::zero(), F::zero())
    }

    /// Creates the point located at the lower corner of the given voxel.
    pub fn from_idx(indices: &Idx3<usize>) -> Self {
        Self::with_each_component(|dim| {
            F::from(indices[dim]).expect("Conversion failed")
        })
    }

    /// Whether all components are finite.
    pub fn is_finite(&self) -> bool {
        self[X].is_finite() && self[Y].is_finite() && self[Z].is_finite()
    }

    /// Returns the index of the voxel containing the point, obtained by
    /// flooring each component, or `None` if any component is negative
    /// or not finite.
    pub fn floored_idx(&self) -> Option<Idx3<usize>> {
        let floor_component = |dim| {
            let value = self[dim];
            if value.is_finite() && value >= F::zero() {
                num::cast::<F, usize>(value.floor())
            } else {
                None
            }
        };
        Some(Idx3::new(
            floor_component(X)?,
            floor_component(Y)?,
            floor_component(Z)?,
        ))
    }
}

impl<F: BFloat> Index<Dim3> for Point3<F> {
    type Output = F;
    fn index(&self, dim: Dim3) -> &Self::Output {
        &self.0[dim]
    }
}

impl<F: BFloat> IndexMut<Dim3> for Point3<F> {
    fn index_mut(&mut self, dim: Dim3) -> &mut Self::Output {
        &mut self.0[dim]
    }
}

impl<'a, F: BFloat> Add<&'a Vec3<F>> for &'a Point3<F> {
    type Output = Point3<F>;
    fn add(self, displacement: &'a Vec3<F>) -> Self::Output {
        Point3::new(
            self[X] + displacement[X],
            self[Y] + displacement[Y],
            self[Z] + displacement[Z],
        )
    }
}

impl<'a, F: BFloat> Sub<&'a Point3<F>> for &'a Point3<F> {
    type Output = Vec3<F>;
    fn sub(self, other: &'a Point3<F>) -> Self::Output {
        Vec3::new(self[X] - other[X], self[Y] - other[Y], self[Z] - other[Z])
    }
}

impl<F: BFloat + fmt::Display> fmt::Display for Point3<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point3{}", self.0)
    }
}

/// A 3D index.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct Idx3<I>(In3D<I>);

impl<I: num::Integer> Idx3<I> {
    /// Creates a new 3D index given the three components.
    pub fn new(i: I, j: I, k: I) -> Self {
        Self(In3D::new(i, j, k))
    }

    /// Creates a new 3D index by evaluating the given component
    /// constructor for each dimension.
    pub fn with_each_component<C>(create_component: C) -> Self
    where
        C: Fn(Dim3) -> I,
    {
        Self(In3D::with_each_component(create_component))
    }

    /// Creates a new 3D index with all components set to zero.
    pub fn origin() -> Self {
        Self::new(I::zero(), I::zero(), I::zero())
    }

    /// Creates a new tuple containing copies of the three components.
    pub fn to_tuple(&self) -> (I, I, I)
    where
        I: Copy,
    {
        self.0.to_tuple()
    }
}

impl<I: num::Integer> Index<Dim3> for Idx3<I> {
    type Output = I;
    fn index(&self, dim: Dim3) -> &Self::Output {
        &self.0[dim]
    }
}

impl<I: num::Integer> IndexMut<Dim3> for Idx3<I> {
    fn index_mut(&mut self, dim: Dim3) -> &mut Self::Output {
        &mut self.0[dim]
    }
}

impl<I: num::Integer + fmt::Display> fmt::Display for Idx3<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn flooring_point_gives_containing_voxel() {
        assert_eq!(
            Point3::new(2.0, 0.999, 3.5).floored_idx(),
            Some(Idx3::new(2, 0, 3))
        );
        assert_eq!(Point3::new(-0.05, 1.0, 1.0).floored_idx(), None);
        assert_eq!(Point3::new(f64::NAN, 1.0, 1.0).floored_idx(), None);
        assert_eq!(Point3::new(1.0, f64::INFINITY, 1.0).floored_idx(), None);
    }

    #[test]
    fn displacing_point_adds_components() {
        let moved = &Point3::new(1.0, 2.0, 3.0) + &(Vec3::new(0.0, 0.0, -1.0) * 0.1);
        assert_eq!(moved, Point3::new(1.0, 2.0, 2.9));
        assert_eq!(&moved - &Point3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 0.0, 2.9 - 3.0));
    }
}
