use std::fmt::Debug;

use num_traits::{AsPrimitive, NumCast, PrimInt, Zero};

/// Numeric type stored in a matrix.
///
/// Implemented for every primitive numeric type. The bound exists so that
/// extractors can zero-fill dense buffers and so that consumers can compare
/// extracted values in tests; it deliberately demands nothing about arithmetic
/// beyond what [`Zero`] implies.
pub trait Value: Copy + Default + PartialEq + Zero + Debug + Send + Sync + 'static {}

impl<T> Value for T where T: Copy + Default + PartialEq + Zero + Debug + Send + Sync + 'static {}

/// Integer type used to index positions along a matrix dimension.
///
/// Dimension extents are stored in this type, while extent arithmetic (for
/// example offsets into the backing storage, whose length is the product of
/// both extents) is performed in `usize`.
pub trait Index: PrimInt + AsPrimitive<usize> + Debug + Send + Sync + 'static {
    /// Widen to `usize` for offset arithmetic.
    fn to_usize(self) -> usize {
        self.as_()
    }

    /// Narrow a position back into the index type.
    ///
    /// Panics if the position does not fit; positions handed to this method
    /// are always bounded by a dimension extent, which does fit.
    fn from_usize(position: usize) -> Self {
        <Self as NumCast>::from(position).expect("dimension position must fit the index type")
    }
}

impl<T> Index for T where T: PrimInt + AsPrimitive<usize> + Debug + Send + Sync + 'static {}
