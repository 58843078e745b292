use serde::{Deserialize, Serialize};
use crate::index_space::IndexSpace;




/**
 * A patch is a mapping from a rectangular subset of the global index space
 * to a fixed number of field values per cell. The mapping is backed by a
 * contiguous, row-major buffer; the fields of one cell are adjacent in
 * memory. The element type is generic so the same container holds the
 * floating point state and the integer sign-tracking counters.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patch<T = f64> {
    space: IndexSpace,
    num_fields: usize,
    data: Vec<T>,
}




// ============================================================================
impl<T: Copy + Default> Patch<T> {




    /**
     * Generate a patch covering the given space, with every field of every
     * cell set to the default value of `T` (zero for numeric types).
     */
    pub fn zeros(space: IndexSpace, num_fields: usize) -> Self {
        Self {
            data: vec![T::default(); space.len() * num_fields],
            space,
            num_fields,
        }
    }


    /**
     * Return a new patch covering the given subset of this one, copying
     * the data.
     */
    pub fn extract(&self, subspace: &IndexSpace) -> Self {
        let region = subspace.memory_region_in(&self.space);
        let data = region
            .iter_slice(&self.data, self.num_fields)
            .flat_map(|s| s.iter().cloned())
            .collect();

        Self {
            space: subspace.clone(),
            num_fields: self.num_fields,
            data,
        }
    }
}




// ============================================================================
impl<T: Copy> Patch<T> {


    /**
     * Return the index space covered by this patch.
     */
    pub fn index_space(&self) -> &IndexSpace {
        &self.space
    }


    /**
     * Return the underlying buffer as a flat slice.
     */
    pub fn data(&self) -> &[T] {
        &self.data
    }


    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }


    /**
     * Return the fields of the cell at the given index. Panics if the index
     * is out of range.
     */
    pub fn get_slice(&self, index: (i64, i64, i64)) -> &[T] {
        self.validate_index(index);
        let s = self.space.row_major_offset(index) * self.num_fields;
        &self.data[s .. s + self.num_fields]
    }


    pub fn get_slice_mut(&mut self, index: (i64, i64, i64)) -> &mut [T] {
        self.validate_index(index);
        let s = self.space.row_major_offset(index) * self.num_fields;
        &mut self.data[s .. s + self.num_fields]
    }


    /**
     * Return one field at the given index.
     */
    pub fn get(&self, index: (i64, i64, i64), field: usize) -> T {
        self.get_slice(index)[field]
    }


    pub fn set(&mut self, index: (i64, i64, i64), field: usize, value: T) {
        self.get_slice_mut(index)[field] = value
    }


    /**
     * Copy the overlapping part of another patch into this one. The two
     * patches must have the same number of fields.
     */
    pub fn insert(&mut self, other: &Self) {
        assert_eq!(self.num_fields, other.num_fields, "patches have different field counts");

        if let Some(overlap) = self.space.intersect(&other.space) {
            let source = overlap.memory_region_in(&other.space);
            let target = overlap.memory_region_in(&self.space);

            for (a, b) in target
                .iter_slice_mut(&mut self.data, self.num_fields)
                .zip(source.iter_slice(&other.data, other.num_fields))
            {
                a.copy_from_slice(b)
            }
        }
    }


    /**
     * Shift the index space of this patch by the given offset, leaving the
     * data unchanged.
     */
    pub fn translate(self, delta: (i64, i64, i64)) -> Self {
        Self {
            space: self.space.shift(delta),
            num_fields: self.num_fields,
            data: self.data,
        }
    }


    fn validate_index(&self, index: (i64, i64, i64)) {
        if !self.space.contains(index) {
            let (i0, j0, k0) = self.space.start();
            let (i1, j1, k1) = self.space.end();
            panic!("index ({} {} {}) out of range on patch ({}..{} {}..{} {}..{})",
                index.0,
                index.1,
                index.2,
                i0, i1, j0, j1, k0, k1);
        }
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use crate::index_space::{range3d, IndexSpace};
    use super::Patch;

    #[test]
    fn patch_get_and_set_works() {
        let mut patch = Patch::<f64>::zeros(range3d(0..4, 0..4, 0..1), 3);
        patch.set((2, 3, 0), 1, 5.0);
        assert_eq!(patch.get((2, 3, 0), 1), 5.0);
        assert_eq!(patch.get_slice((2, 3, 0)), &[0.0, 5.0, 0.0]);
    }

    fn numbered(space: IndexSpace) -> Patch {
        let mut patch = Patch::zeros(space.clone(), 2);
        for (i, j, k) in space.iter() {
            let n = (i * 100 + j * 10 + k) as f64;
            patch.get_slice_mut((i, j, k)).copy_from_slice(&[n, -n]);
        }
        patch
    }

    #[test]
    fn extract_then_insert_restores_the_subregion() {
        let space = range3d(0..6, 0..5, 0..2);
        let sub = numbered(space.clone()).extract(&range3d(1..3, 2..5, 1..2));
        assert_eq!(sub.get((2, 4, 1), 0), 241.0);

        let mut target = Patch::zeros(space, 2);
        target.insert(&sub);
        assert_eq!(target.get((2, 4, 1), 1), -241.0);
        assert_eq!(target.get((0, 0, 0), 0), 0.0);
    }

    #[test]
    fn translated_patch_is_inserted_at_the_image() {
        let source = numbered(range3d(0..2, 0..1, 0..1));
        let mut target = Patch::zeros(range3d(8..12, 0..1, 0..1), 2);
        target.insert(&source.translate((10, 0, 0)));
        assert_eq!(target.get((10, 0, 0), 0), 0.0);
        assert_eq!(target.get((11, 0, 0), 0), 100.0);
        assert_eq!(target.get((11, 0, 0), 1), -100.0);
        assert_eq!(target.index_space(), &range3d(8..12, 0..1, 0..1));
    }

    #[test]
    #[should_panic]
    fn out_of_range_access_panics() {
        let patch = Patch::<f64>::zeros(range3d(0..2, 0..2, 0..1), 1);
        patch.get((2, 0, 0), 0);
    }
}
