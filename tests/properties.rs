//! Property-based checks of the access protocol invariants, comparing every
//! backend and wrapper against naive slices of a row-major reference.

use std::sync::Arc;

use proptest::prelude::*;
use slicewise::{
    CastMatrix, CompressedSparseMatrix, DenseMatrix, FixedOracle,
    IsometricMatrix, Matrix, Options, Selection, StorageOrder, TransposeMatrix,
    ops::AddScalar,
};

/// Row-major reference contents of a test matrix.
#[derive(Debug, Clone)]
struct Reference {
    nrows: usize,
    ncols: usize,
    values: Vec<i32>,
}

impl Reference {
    fn at(&self, row: usize, column: usize) -> i32 {
        self.values[row * self.ncols + column]
    }

    /// The expected dense output for one fetch.
    fn slice(&self, by_row: bool, target: usize, selection: &Selection<u32>) -> Vec<i32> {
        self.positions(by_row, selection)
            .into_iter()
            .map(|position| {
                if by_row {
                    self.at(target, position)
                } else {
                    self.at(position, target)
                }
            })
            .collect()
    }

    fn positions(&self, by_row: bool, selection: &Selection<u32>) -> Vec<usize> {
        let extent = if by_row { self.ncols } else { self.nrows };
        match selection {
            Selection::Full => (0..extent).collect(),
            Selection::Block { start, length } => {
                (*start as usize..*start as usize + *length as usize).collect()
            }
            Selection::Index(subset) => subset.iter().map(|&position| position as usize).collect(),
        }
    }

    fn dense(&self, order: StorageOrder) -> DenseMatrix<i32, u32> {
        let values = match order {
            StorageOrder::RowMajor => self.values.clone(),
            StorageOrder::ColumnMajor => {
                let mut transposed = Vec::with_capacity(self.values.len());
                for column in 0..self.ncols {
                    for row in 0..self.nrows {
                        transposed.push(self.at(row, column));
                    }
                }
                transposed
            }
        };
        DenseMatrix::new(self.nrows as u32, self.ncols as u32, values, order).unwrap()
    }

    fn compressed(&self, order: StorageOrder) -> CompressedSparseMatrix<i32, u32> {
        let (major, minor) = match order {
            StorageOrder::RowMajor => (self.nrows, self.ncols),
            StorageOrder::ColumnMajor => (self.ncols, self.nrows),
        };
        let mut values = Vec::new();
        let mut indices = Vec::new();
        let mut pointers = vec![0];
        for primary in 0..major {
            for secondary in 0..minor {
                let value = match order {
                    StorageOrder::RowMajor => self.at(primary, secondary),
                    StorageOrder::ColumnMajor => self.at(secondary, primary),
                };
                if value != 0 {
                    values.push(value);
                    indices.push(secondary as u32);
                }
            }
            pointers.push(values.len());
        }
        CompressedSparseMatrix::new(
            self.nrows as u32,
            self.ncols as u32,
            values,
            indices,
            pointers,
            order,
        )
        .unwrap()
    }
}

fn reference() -> impl Strategy<Value = Reference> {
    (1usize..6, 1usize..6).prop_flat_map(|(nrows, ncols)| {
        // A narrow value range keeps the matrices sparse enough to exercise
        // empty rows and short-circuits.
        prop::collection::vec(prop_oneof![Just(0), Just(0), -3i32..4], nrows * ncols).prop_map(
            move |values| Reference {
                nrows,
                ncols,
                values,
            },
        )
    })
}

/// The selections exercised for every matrix, derived from two free bytes.
fn selections(extent: usize, seed: (u8, u8)) -> Vec<Selection<u32>> {
    let start = seed.0 as usize % extent;
    let length = 1 + seed.1 as usize % (extent - start);
    let every_other = (0..extent).step_by(2).map(|position| position as u32).collect();
    vec![
        Selection::Full,
        Selection::Block {
            start: start as u32,
            length: length as u32,
        },
        Selection::Index(every_other),
    ]
}

/// Checks one matrix against the reference on every axis and selection:
/// dense output equals the naive slice, sparse output scattered over zeros
/// equals the dense output, sparse indices are strictly increasing and lie in
/// the selection, and repeated fetches are idempotent.
fn check_against_reference(
    matrix: &dyn Matrix<i32, u32>,
    reference: &Reference,
    seed: (u8, u8),
    options: &Options,
) {
    for by_row in [true, false] {
        let extent = if by_row {
            reference.ncols
        } else {
            reference.nrows
        };
        let targets = if by_row {
            reference.nrows
        } else {
            reference.ncols
        };
        for selection in selections(extent, seed) {
            let mut dense = if by_row {
                matrix.dense_row(selection.clone(), options).unwrap()
            } else {
                matrix.dense_column(selection.clone(), options).unwrap()
            };
            let mut sparse = if by_row {
                matrix.sparse_row(selection.clone(), options).unwrap()
            } else {
                matrix.sparse_column(selection.clone(), options).unwrap()
            };
            let positions = reference.positions(by_row, &selection);
            for target in 0..targets {
                let expected = reference.slice(by_row, target, &selection);
                let produced = dense.fetch_to_vec(target as u32).unwrap();
                assert_eq!(expected, produced, "dense slice mismatch");
                assert_eq!(
                    produced,
                    dense.fetch_to_vec(target as u32).unwrap(),
                    "repeated dense fetch changed"
                );

                let contents = sparse.fetch_owned(target as u32).unwrap();
                assert_eq!(contents.number, contents.value.len());
                assert_eq!(contents.number, contents.index.len());
                assert!(
                    contents.index.windows(2).all(|pair| pair[0] < pair[1]),
                    "sparse indices not strictly increasing"
                );
                let mut scattered = vec![0; positions.len()];
                for (&value, &index) in contents.value.iter().zip(&contents.index) {
                    let slot = positions
                        .iter()
                        .position(|&position| position == index as usize)
                        .expect("sparse index outside the selection");
                    scattered[slot] = value;
                }
                assert_eq!(expected, scattered, "sparse support disagrees with dense");
                assert_eq!(
                    contents,
                    sparse.fetch_owned(target as u32).unwrap(),
                    "repeated sparse fetch changed"
                );
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn in_memory_backends_agree_with_naive_slices(
        reference in reference(),
        seed in (any::<u8>(), any::<u8>()),
    ) {
        let options = Options::default();
        check_against_reference(&reference.dense(StorageOrder::RowMajor), &reference, seed, &options);
        check_against_reference(&reference.dense(StorageOrder::ColumnMajor), &reference, seed, &options);
        check_against_reference(&reference.compressed(StorageOrder::RowMajor), &reference, seed, &options);
        check_against_reference(&reference.compressed(StorageOrder::ColumnMajor), &reference, seed, &options);
    }

    #[test]
    fn caching_and_unordered_modes_change_nothing(
        reference in reference(),
        seed in (any::<u8>(), any::<u8>()),
    ) {
        let options = Options {
            cache_for_reuse: true,
            sparse_ordered_index: false,
            ..Options::default()
        };
        check_against_reference(&reference.compressed(StorageOrder::RowMajor), &reference, seed, &options);
        check_against_reference(&reference.compressed(StorageOrder::ColumnMajor), &reference, seed, &options);
    }

    #[test]
    fn transposing_twice_is_the_identity(
        reference in reference(),
        seed in (any::<u8>(), any::<u8>()),
    ) {
        let inner: Arc<dyn Matrix<i32, u32>> = Arc::new(reference.compressed(StorageOrder::RowMajor));
        let round_trip = TransposeMatrix::new(Arc::new(TransposeMatrix::new(inner)));
        check_against_reference(&round_trip, &reference, seed, &Options::default());
    }

    #[test]
    fn transposition_swaps_the_reference(reference in reference()) {
        let transposed = Reference {
            nrows: reference.ncols,
            ncols: reference.nrows,
            values: {
                let mut swapped = Vec::with_capacity(reference.values.len());
                for column in 0..reference.ncols {
                    for row in 0..reference.nrows {
                        swapped.push(reference.at(row, column));
                    }
                }
                swapped
            },
        };
        let inner: Arc<dyn Matrix<i32, u32>> = Arc::new(reference.dense(StorageOrder::RowMajor));
        let matrix = TransposeMatrix::new(inner);
        check_against_reference(&matrix, &transposed, (0, 0), &Options::default());
    }

    #[test]
    fn casting_to_identical_types_is_the_identity(
        reference in reference(),
        seed in (any::<u8>(), any::<u8>()),
    ) {
        let inner: Arc<dyn Matrix<i32, u32>> = Arc::new(reference.compressed(StorageOrder::ColumnMajor));
        let cast: CastMatrix<i32, u32, i32, u32> = CastMatrix::new(inner);
        check_against_reference(&cast, &reference, seed, &Options::default());
    }

    #[test]
    fn isometric_results_match_the_mapped_reference(
        reference in reference(),
        seed in (any::<u8>(), any::<u8>()),
        shift in 1i32..5,
    ) {
        let mapped = Reference {
            nrows: reference.nrows,
            ncols: reference.ncols,
            values: reference.values.iter().map(|&value| value + shift).collect(),
        };
        let inner: Arc<dyn Matrix<i32, u32>> = Arc::new(reference.compressed(StorageOrder::RowMajor));
        let matrix = IsometricMatrix::new(inner, AddScalar::new(shift));
        check_against_reference(&matrix, &mapped, seed, &Options::default());
    }

    #[test]
    fn oracles_do_not_change_the_output(reference in reference()) {
        let matrix = reference.compressed(StorageOrder::RowMajor);
        let targets: Vec<u32> = (0..reference.ncols as u32).rev().collect();
        let mut plain = matrix.sparse_column(Selection::Full, &Options::default()).unwrap();
        let mut advised = matrix.sparse_column(Selection::Full, &Options::default()).unwrap();
        advised.set_oracle(Some(Box::new(FixedOracle::new(targets.clone()))));
        for &target in &targets {
            prop_assert_eq!(
                plain.fetch_owned(target).unwrap(),
                advised.fetch_owned(target).unwrap()
            );
        }
    }

    #[test]
    fn walker_boundaries_match_naive_slices(reference in reference()) {
        // Secondary access on a CSC matrix retrieves rows; hop between the
        // first row, the last row and the midpoint in both directions.
        let matrix = reference.compressed(StorageOrder::ColumnMajor);
        let mut extractor = matrix.dense_row(Selection::Full, &Options::default()).unwrap();
        let last = reference.nrows - 1;
        let middle = reference.nrows / 2;
        for target in [0, last, 0, middle, last, middle, 0] {
            prop_assert_eq!(
                reference.slice(true, target, &Selection::Full),
                extractor.fetch_to_vec(target as u32).unwrap()
            );
        }
    }

    #[test]
    fn value_and_index_streams_skip_independently(reference in reference()) {
        let matrix = reference.compressed(StorageOrder::RowMajor);
        let mut both = matrix.sparse_row(Selection::Full, &Options::default()).unwrap();
        let no_values = Options { sparse_extract_value: false, ..Options::default() };
        let mut indices_only = matrix.sparse_row(Selection::Full, &no_values).unwrap();
        let no_indices = Options { sparse_extract_index: false, ..Options::default() };
        let mut values_only = matrix.sparse_row(Selection::Full, &no_indices).unwrap();
        for row in 0..reference.nrows as u32 {
            let full = both.fetch_owned(row).unwrap();
            let index_stream = indices_only.fetch_owned(row).unwrap();
            prop_assert!(index_stream.value.is_empty());
            prop_assert_eq!(&full.index, &index_stream.index);
            let value_stream = values_only.fetch_owned(row).unwrap();
            prop_assert!(value_stream.index.is_empty());
            prop_assert_eq!(&full.value, &value_stream.value);
        }
    }
}
