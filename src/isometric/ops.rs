//! Ready-made scalar arithmetic for [`IsometricMatrix`](super::IsometricMatrix).
//!
//! Each helper applies one binary arithmetic operation between every matrix
//! element and a fixed scalar, with the sparsity flags filled in correctly:
//! multiplying or dividing by a scalar maps zero to zero, while adding or
//! subtracting a non-zero scalar does not.

use std::ops::{Add, Div, Mul, Sub};

use crate::{
    element::{Index, Value},
    isometric::UnaryOperation,
};

/// Adds a scalar to every element.
#[derive(Debug, Clone, Copy)]
pub struct AddScalar<V> {
    scalar: V,
}

impl<V> AddScalar<V> {
    pub fn new(scalar: V) -> Self {
        AddScalar { scalar }
    }
}

impl<V, I> UnaryOperation<V, I> for AddScalar<V>
where
    V: Value + Add<Output = V>,
    I: Index,
{
    fn apply(&self, _row: I, _column: I, value: V) -> V {
        value + self.scalar
    }

    fn is_sparse(&self) -> bool {
        self.scalar == V::zero()
    }
}

/// Subtracts a scalar from every element, or every element from a scalar.
#[derive(Debug, Clone, Copy)]
pub struct SubtractScalar<V> {
    scalar: V,
    from_scalar: bool,
}

impl<V> SubtractScalar<V> {
    /// Computes `element - scalar`.
    pub fn new(scalar: V) -> Self {
        SubtractScalar {
            scalar,
            from_scalar: false,
        }
    }

    /// Computes `scalar - element`.
    pub fn from_scalar(scalar: V) -> Self {
        SubtractScalar {
            scalar,
            from_scalar: true,
        }
    }
}

impl<V, I> UnaryOperation<V, I> for SubtractScalar<V>
where
    V: Value + Sub<Output = V>,
    I: Index,
{
    fn apply(&self, _row: I, _column: I, value: V) -> V {
        if self.from_scalar {
            self.scalar - value
        } else {
            value - self.scalar
        }
    }

    fn is_sparse(&self) -> bool {
        // scalar - 0 only stays zero for a zero scalar, and so does 0 - scalar.
        self.scalar == V::zero()
    }
}

/// Multiplies every element by a scalar.
#[derive(Debug, Clone, Copy)]
pub struct MultiplyScalar<V> {
    scalar: V,
}

impl<V> MultiplyScalar<V> {
    pub fn new(scalar: V) -> Self {
        MultiplyScalar { scalar }
    }
}

impl<V, I> UnaryOperation<V, I> for MultiplyScalar<V>
where
    V: Value + Mul<Output = V>,
    I: Index,
{
    fn apply(&self, _row: I, _column: I, value: V) -> V {
        value * self.scalar
    }

    fn is_sparse(&self) -> bool {
        true
    }
}

/// Divides every element by a scalar, or a scalar by every element.
#[derive(Debug, Clone, Copy)]
pub struct DivideScalar<V> {
    scalar: V,
    from_scalar: bool,
}

impl<V> DivideScalar<V> {
    /// Computes `element / scalar`.
    pub fn new(scalar: V) -> Self {
        DivideScalar {
            scalar,
            from_scalar: false,
        }
    }

    /// Computes `scalar / element`.
    pub fn from_scalar(scalar: V) -> Self {
        DivideScalar {
            scalar,
            from_scalar: true,
        }
    }
}

impl<V, I> UnaryOperation<V, I> for DivideScalar<V>
where
    V: Value + Div<Output = V>,
    I: Index,
{
    fn apply(&self, _row: I, _column: I, value: V) -> V {
        if self.from_scalar {
            self.scalar / value
        } else {
            value / self.scalar
        }
    }

    fn is_sparse(&self) -> bool {
        // 0 / scalar stays zero; scalar / 0 does not.
        !self.from_scalar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_is_only_sparse_for_a_zero_scalar() {
        assert!(!UnaryOperation::<i32, u32>::is_sparse(&AddScalar::new(1)));
        assert!(UnaryOperation::<i32, u32>::is_sparse(&AddScalar::new(0)));
    }

    #[test]
    fn subtraction_from_a_scalar_flips_the_operands() {
        let from = SubtractScalar::from_scalar(10);
        assert_eq!(7, UnaryOperation::<i32, u32>::apply(&from, 0, 0, 3));
        let plain = SubtractScalar::new(10);
        assert_eq!(-7, UnaryOperation::<i32, u32>::apply(&plain, 0, 0, 3));
    }

    #[test]
    fn scaling_preserves_sparsity() {
        assert!(UnaryOperation::<f64, u32>::is_sparse(&MultiplyScalar::new(0.5)));
        assert!(UnaryOperation::<f64, u32>::is_sparse(&DivideScalar::new(2.0)));
        assert!(!UnaryOperation::<f64, u32>::is_sparse(
            &DivideScalar::from_scalar(2.0)
        ));
    }
}
