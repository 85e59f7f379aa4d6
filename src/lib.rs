//! # About
//!
//! `slicewise` gives numerical pipelines one interface for reading
//! two-dimensional numeric matrices a row or column at a time, regardless of
//! whether the data is dense or sparse in memory, or synthesised on the fly
//! by a delayed operation. Pipelines that cannot afford to materialise a
//! whole matrix ask a [`Matrix`] for an extractor, choosing the access
//! direction, a [`Selection`] along the other dimension and some [`Options`],
//! and then pull one slice per `fetch` call.
//!
//! Two in-memory backends are provided ([`DenseMatrix`] and the compressed
//! sparse pair [`CompressedSparseMatrix`] / [`SemiCompressedSparseMatrix`]),
//! along with delayed wrappers that cast element types ([`CastMatrix`]),
//! transpose ([`TransposeMatrix`]) or apply an element-wise operation
//! ([`IsometricMatrix`]) without copying the data. Out-of-core backends can
//! join by implementing [`Matrix`] themselves.

mod cast;
mod constant;
mod convert;
mod dense;
mod element;
mod error;
mod extractor;
mod isometric;
mod matrix;
mod options;
mod oracle;
mod sparse;
mod sparsified;
mod transpose;

pub use self::{
    cast::CastMatrix,
    constant::ConstantMatrix,
    convert::convert_to_dense,
    dense::DenseMatrix,
    element::{Index, Value},
    error::Error,
    extractor::{DenseExtractor, SparseContents, SparseExtractor, SparseRange},
    isometric::{IsometricMatrix, UnaryOperation, ops},
    matrix::Matrix,
    options::{Options, Selection, StorageOrder},
    oracle::{ConsecutiveOracle, FixedOracle, Oracle},
    sparse::{CompressedSparseMatrix, SemiCompressedSparseMatrix},
    transpose::TransposeMatrix,
};
