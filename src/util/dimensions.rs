//! Parameter dimension lists.
//!
//! Dimensions describe the shape of a parameter's payload.

use smallvec::SmallVec;

/// Dimensions of a parameter value.
///
/// Empty means scalar (rank 0). Rank 1 is a flat array, rank 2 a fixed-width
/// string table. Sizes are stored as the wire's unsigned bytes; the format
/// caps the rank at [`Dimensions::MAX_RANK`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dimensions {
    /// On-wire sizes, first dimension first. Empty for scalars.
    dims: SmallVec<[u8; 7]>,
}

impl Dimensions {
    /// Highest rank the wire format can describe.
    pub const MAX_RANK: usize = 7;

    /// Scalar shape (rank 0).
    pub fn scalar() -> Self {
        Self {
            dims: SmallVec::new(),
        }
    }

    /// Flat array of `size` elements.
    pub fn d1(size: u8) -> Self {
        Self {
            dims: smallvec::smallvec![size],
        }
    }

    /// Create 2D dimensions. For string tables the first size is the row
    /// width and the second the row count.
    pub fn d2(width: u8, count: u8) -> Self {
        Self {
            dims: smallvec::smallvec![width, count],
        }
    }

    /// Create dimensions from a slice of sizes, as read off the wire.
    pub fn from_slice(sizes: &[u8]) -> Self {
        Self {
            dims: SmallVec::from_slice(sizes),
        }
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Size of one dimension, None past the rank.
    pub fn size(&self, dim: usize) -> Option<u8> {
        self.dims.get(dim).copied()
    }

    /// The raw size list.
    pub fn sizes(&self) -> &[u8] {
        &self.dims
    }

    /// Element count: the product of all sizes, 1 for a scalar.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().map(|&s| s as usize).product()
    }

    /// True for rank 0.
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sizes: Vec<String> = self.dims.iter().map(|s| s.to_string()).collect();
        write!(f, "[{}]", sizes.join(" x "))
    }
}
