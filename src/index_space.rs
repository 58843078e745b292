use core::ops::Range;
use serde::{Deserialize, Serialize};




/**
 * Identifier for a Cartesian axis
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    I,
    J,
    K,
}




// ============================================================================
impl Axis {

    pub const ALL: [Axis; 3] = [Axis::I, Axis::J, Axis::K];

    /**
     * Return the position of this axis in an index triple.
     */
    pub fn index(self) -> usize {
        match self {
            Axis::I => 0,
            Axis::J => 1,
            Axis::K => 2,
        }
    }

    /**
     * Return the unit offset along this axis.
     */
    pub fn unit(self) -> (i64, i64, i64) {
        match self {
            Axis::I => (1, 0, 0),
            Axis::J => (0, 1, 0),
            Axis::K => (0, 0, 1),
        }
    }

    /**
     * Return the two axes which complete a right-handed cyclic triple
     * starting with this one: (I, J, K), (J, K, I), or (K, I, J).
     */
    pub fn cyclic(self) -> (Axis, Axis) {
        match self {
            Axis::I => (Axis::J, Axis::K),
            Axis::J => (Axis::K, Axis::I),
            Axis::K => (Axis::I, Axis::J),
        }
    }
}




/**
 * Offset an index triple by `delta` steps along the given axis.
 */
pub fn offset(index: (i64, i64, i64), delta: i64, axis: Axis) -> (i64, i64, i64) {
    let (a, b, c) = axis.unit();
    (index.0 + a * delta, index.1 + b * delta, index.2 + c * delta)
}




/**
 * Return the component of an index triple along the given axis.
 */
pub fn component(index: (i64, i64, i64), axis: Axis) -> i64 {
    match axis {
        Axis::I => index.0,
        Axis::J => index.1,
        Axis::K => index.2,
    }
}




/**
 * Return a copy of an index triple with one component replaced.
 */
pub fn with_component(index: (i64, i64, i64), axis: Axis, value: i64) -> (i64, i64, i64) {
    match axis {
        Axis::I => (value, index.1, index.2),
        Axis::J => (index.0, value, index.2),
        Axis::K => (index.0, index.1, value),
    }
}




#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]


/**
 * Represents a rectangular region in a discrete 3D index space
 */
pub struct IndexSpace {
    di: Range<i64>,
    dj: Range<i64>,
    dk: Range<i64>,
}




/**
 * Describes a rectangular index space. The index type is signed 64-bit integer.
 */
impl IndexSpace {


    pub fn new(di: Range<i64>, dj: Range<i64>, dk: Range<i64>) -> Self {

        assert!(
            di.start <= di.end && dj.start <= dj.end && dk.start <= dk.end,
            "index space has negative volume");

        Self { di, dj, dk }
    }


    /**
     * Return the number of indexes on each axis.
     */
    pub fn dim(&self) -> (usize, usize, usize) {
        ((self.di.end - self.di.start) as usize,
         (self.dj.end - self.dj.start) as usize,
         (self.dk.end - self.dk.start) as usize)
    }


    /**
     * Return the number of elements in this index space.
     */
    pub fn len(&self) -> usize {
        let (l, m, n) = self.dim();
        l * m * n
    }


    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }


    /**
     * Return the minimum index (inclusive).
     */
    pub fn start(&self) -> (i64, i64, i64) {
        (self.di.start, self.dj.start, self.dk.start)
    }


    /**
     * Return the maximum index (exclusive).
     */
    pub fn end(&self) -> (i64, i64, i64) {
        (self.di.end, self.dj.end, self.dk.end)
    }


    /**
     * Return the index range along the given axis.
     */
    pub fn range(&self, axis: Axis) -> Range<i64> {
        match axis {
            Axis::I => self.di.clone(),
            Axis::J => self.dj.clone(),
            Axis::K => self.dk.clone(),
        }
    }


    /**
     * Return a copy of this index space with the range on one axis
     * replaced.
     */
    pub fn with_range(&self, axis: Axis, range: Range<i64>) -> Self {
        match axis {
            Axis::I => Self::new(range, self.dj.clone(), self.dk.clone()),
            Axis::J => Self::new(self.di.clone(), range, self.dk.clone()),
            Axis::K => Self::new(self.di.clone(), self.dj.clone(), range),
        }
    }


    /**
     * Determine whether this index space contains the given index.
     */
    pub fn contains(&self, index: (i64, i64, i64)) -> bool {
        self.di.contains(&index.0) && self.dj.contains(&index.1) && self.dk.contains(&index.2)
    }


    /**
     * Determine whether another index space is a subset of this one.
     */
    pub fn contains_space(&self, other: &Self) -> bool {
        other.di.start >= self.di.start && other.di.end <= self.di.end &&
        other.dj.start >= self.dj.start && other.dj.end <= self.dj.end &&
        other.dk.start >= self.dk.start && other.dk.end <= self.dk.end
    }


    /**
     * Return the overlap of two index spaces, or `None` if they do not
     * overlap.
     */
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let di = self.di.start.max(other.di.start) .. self.di.end.min(other.di.end);
        let dj = self.dj.start.max(other.dj.start) .. self.dj.end.min(other.dj.end);
        let dk = self.dk.start.max(other.dk.start) .. self.dk.end.min(other.dk.end);

        if di.start < di.end && dj.start < dj.end && dk.start < dk.end {
            Some(Self { di, dj, dk })
        } else {
            None
        }
    }


    /**
     * Expand this index space by the given number of elements on both ends
     * of one axis.
     */
    pub fn extend(&self, delta: i64, axis: Axis) -> Self {
        let r = self.range(axis);
        self.with_range(axis, r.start - delta .. r.end + delta)
    }


    /**
     * Expand this index space on every axis flagged in `active`.
     */
    pub fn extend_active(&self, delta: i64, active: [bool; 3]) -> Self {
        Axis::ALL
            .iter()
            .filter(|axis| active[axis.index()])
            .fold(self.clone(), |space, &axis| space.extend(delta, axis))
    }


    /**
     * Expand just the upper end of this index space along one axis.
     */
    pub fn extend_upper(&self, delta: i64, axis: Axis) -> Self {
        let r = self.range(axis);
        self.with_range(axis, r.start .. r.end + delta)
    }


    /**
     * Shift this index space by an arbitrary offset.
     */
    pub fn shift(&self, delta: (i64, i64, i64)) -> Self {
        Self::new(
            self.di.start + delta.0 .. self.di.end + delta.0,
            self.dj.start + delta.1 .. self.dj.end + delta.1,
            self.dk.start + delta.2 .. self.dk.end + delta.2)
    }


    /**
     * Return the linear offset for the given index, in a row-major memory
     * buffer aligned with the start of this index space.
     */
    pub fn row_major_offset(&self, index: (i64, i64, i64)) -> usize {
        let i = (index.0 - self.di.start) as usize;
        let j = (index.1 - self.dj.start) as usize;
        let k = (index.2 - self.dk.start) as usize;
        let (_, m, n) = self.dim();
        (i * m + j) * n + k
    }


    /**
     * Return a memory region object corresponding to the selection of this
     * index space in the buffer allocated for another one.
     */
    pub fn memory_region_in(&self, parent: &Self) -> MemoryRegion {
        assert!(parent.contains_space(self), "selection is not contained in the parent space");

        let start = (
            (self.di.start - parent.di.start) as usize,
            (self.dj.start - parent.dj.start) as usize,
            (self.dk.start - parent.dk.start) as usize);
        let count = self.dim();
        let shape = parent.dim();
        MemoryRegion { start, count, shape }
    }


    /**
     * Return an iterator which traverses the index space in row-major order
     * (C-like; the final index increases fastest).
     */
    pub fn iter(&self) -> impl Iterator<Item = (i64, i64, i64)> + '_ {
        self.di.clone().flat_map(move |i| {
            self.dj.clone().flat_map(move |j| self.dk.clone().map(move |k| (i, j, k)))
        })
    }
}




/**
 * Less imposing factory function to construct an IndexSpace object.
 */
pub fn range3d(di: Range<i64>, dj: Range<i64>, dk: Range<i64>) -> IndexSpace {
    IndexSpace::new(di, dj, dk)
}




/**
 * A 3D memory region within a contiguous buffer.
 */
#[derive(Clone, Copy, Debug)]
pub struct MemoryRegion {
    start: (usize, usize, usize),
    count: (usize, usize, usize),
    shape: (usize, usize, usize),
}




// ============================================================================
impl MemoryRegion {

    pub fn iter_slice<'a, T>(self, slice: &'a [T], chunk: usize) -> impl Iterator<Item = &'a [T]> {
        let start = self.start;
        let count = self.count;
        let shape = self.shape;
        let s = chunk;
        let r = shape.2 * s;
        let q = shape.1 * r;

        assert!(slice.len() == shape.0 * shape.1 * shape.2 * chunk);

        slice[start.0 * q .. (start.0 + count.0) * q]
        .chunks_exact(q.max(1)).flat_map(move |j| j[start.1 * r .. (start.1 + count.1) * r]
        .chunks_exact(r.max(1)).flat_map(move |k| k[start.2 * s .. (start.2 + count.2) * s]
        .chunks_exact(s.max(1))))
    }

    pub fn iter_slice_mut<'a, T>(self, slice: &'a mut [T], chunk: usize) -> impl Iterator<Item = &'a mut [T]> {
        let start = self.start;
        let count = self.count;
        let shape = self.shape;
        let s = chunk;
        let r = shape.2 * s;
        let q = shape.1 * r;

        assert!(slice.len() == shape.0 * shape.1 * shape.2 * chunk);

        slice[start.0 * q .. (start.0 + count.0) * q]
        .chunks_exact_mut(q.max(1)).flat_map(move |j| j[start.1 * r .. (start.1 + count.1) * r]
        .chunks_exact_mut(r.max(1)).flat_map(move |k| k[start.2 * s .. (start.2 + count.2) * s]
        .chunks_exact_mut(s.max(1))))
    }
}
