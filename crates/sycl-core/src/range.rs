//! Index spaces: `Range<D>` for extents, `Id<D>` for positions.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range<const D: usize>(pub [usize; D]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id<const D: usize>(pub [usize; D]);

impl<const D: usize> Range<D> {
    #[inline]
    pub fn new(extents: [usize; D]) -> Self {
        Range(extents)
    }

    #[inline]
    pub fn get(&self, dim: usize) -> usize {
        self.0[dim]
    }

    /// Total number of elements.
    pub fn size(&self) -> usize {
        self.0.iter().product()
    }

    /// Total number of elements, or `None` when the product overflows.
    pub fn checked_size(&self) -> Option<usize> {
        self.0.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
    }

    /// Bytes needed for `checked_size()` elements of `elem` bytes each.
    pub fn checked_bytes(&self, elem: usize) -> Option<usize> {
        self.checked_size()?.checked_mul(elem)
    }

    /// Row-major strides (last dimension contiguous).
    pub fn strides(&self) -> [usize; D] {
        let mut strides = [1; D];
        for d in (0..D.saturating_sub(1)).rev() {
            strides[d] = strides[d + 1] * self.0[d + 1];
        }
        strides
    }

    /// Linear position of `id` inside this range.
    pub fn linearize(&self, id: Id<D>) -> usize {
        self.strides().iter().zip(id.0).map(|(s, i)| s * i).sum()
    }

    /// True when `offset + extent` fits inside `self` in every dimension.
    pub fn contains_region(&self, offset: Id<D>, extent: Range<D>) -> bool {
        (0..D).all(|d| {
            offset.0[d]
                .checked_add(extent.0[d])
                .is_some_and(|end| end <= self.0[d])
        })
    }

    /// Every id inside the range, in row-major order.
    pub fn ids(&self) -> impl Iterator<Item = Id<D>> + '_ {
        (0..self.size()).map(move |linear| {
            let mut rest = linear;
            let mut id = [0; D];
            for (d, stride) in self.strides().iter().enumerate() {
                id[d] = rest / stride;
                rest %= stride;
            }
            Id(id)
        })
    }
}

impl<const D: usize> From<[usize; D]> for Range<D> {
    fn from(extents: [usize; D]) -> Self {
        Range(extents)
    }
}

impl From<usize> for Range<1> {
    fn from(n: usize) -> Self {
        Range([n])
    }
}

impl<const D: usize> Id<D> {
    pub const ZERO: Id<D> = Id([0; D]);

    #[inline]
    pub fn new(index: [usize; D]) -> Self {
        Id(index)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&i| i == 0)
    }

    pub fn offset_by(&self, other: Id<D>) -> Id<D> {
        let mut out = self.0;
        for (o, x) in out.iter_mut().zip(other.0) {
            *o += x;
        }
        Id(out)
    }
}

impl<const D: usize> Default for Id<D> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<const D: usize> From<[usize; D]> for Id<D> {
    fn from(index: [usize; D]) -> Self {
        Id(index)
    }
}

impl<const D: usize> fmt::Display for Range<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl<const D: usize> fmt::Display for Id<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}
