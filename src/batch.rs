//! Layout adapter for batched matrix storage
//!
//! Every routine in this crate operates on a batch of column-major matrices
//! that the caller owns in one of three layouts:
//!
//! - **Batched**: one independent buffer per matrix
//! - **Strided**: a single buffer, matrix `b` starting at `b * stride`
//! - **Interleaved**: a single buffer where element `(i, j)` of matrix `b`
//!   sits at `b + i * inca + j * lda`, i.e. consecutive batch instances of
//!   the same element are adjacent
//!
//! All three normalize to one addressing rule: element `(i, j)` of instance
//! `b` lives at `base(b) + shift + i * inca + j * lda`, with `inca == 1` for
//! the batched and strided layouts. Kernels and drivers depend only on this
//! rule, so every routine supports every layout.

use crate::dtype::Element;

/// Column-major offset of element (i, j) under increments (inca, lda)
#[inline]
pub(crate) fn idx2d(i: usize, j: usize, inca: usize, lda: usize) -> usize {
    i * inca + j * lda
}

/// Storage layout of a matrix batch
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Layout {
    /// One buffer per matrix
    Batched,
    /// One buffer, fixed stride between matrices
    Strided,
    /// One buffer, batch instances interleaved element-wise
    Interleaved,
}

enum Storage<'a, T> {
    PerMatrix(Vec<&'a mut [T]>),
    Packed(&'a mut [T]),
}

/// A mutable batch of column-major matrices in one of the three layouts
///
/// The descriptor carries the geometry (`rows`, `cols`, `inca`, `lda`,
/// `stride`, `batch_count`) alongside the storage. Constructors do not
/// validate: geometry is checked by each routine so that inconsistent
/// descriptors surface as [`Error::InvalidSize`](crate::error::Error) from
/// the call, with no output written.
pub struct MatrixBatchMut<'a, T> {
    storage: Storage<'a, T>,
    rows: usize,
    cols: usize,
    inca: usize,
    lda: usize,
    stride: usize,
    batch_count: usize,
}

impl<'a, T: Element> MatrixBatchMut<'a, T> {
    /// Batched layout: one buffer per matrix, unit row increment
    pub fn batched(rows: usize, cols: usize, lda: usize, mats: Vec<&'a mut [T]>) -> Self {
        let batch_count = mats.len();
        Self {
            storage: Storage::PerMatrix(mats),
            rows,
            cols,
            inca: 1,
            lda,
            stride: 0,
            batch_count,
        }
    }

    /// Strided layout: matrix `b` starts at `b * stride` in `data`
    pub fn strided(
        rows: usize,
        cols: usize,
        lda: usize,
        stride: usize,
        batch_count: usize,
        data: &'a mut [T],
    ) -> Self {
        Self {
            storage: Storage::Packed(data),
            rows,
            cols,
            inca: 1,
            lda,
            stride,
            batch_count,
        }
    }

    /// Interleaved layout: element `(i, j)` of matrix `b` at
    /// `b + i * inca + j * lda`
    pub fn interleaved(
        rows: usize,
        cols: usize,
        inca: usize,
        lda: usize,
        batch_count: usize,
        data: &'a mut [T],
    ) -> Self {
        Self {
            storage: Storage::Packed(data),
            rows,
            cols,
            inca,
            lda,
            stride: 1,
            batch_count,
        }
    }

    /// Number of rows of each matrix
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns of each matrix
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row increment (1 except for the interleaved layout)
    pub fn inca(&self) -> usize {
        self.inca
    }

    /// Leading dimension in elements
    pub fn lda(&self) -> usize {
        self.lda
    }

    /// Number of matrices in the batch
    pub fn batch_count(&self) -> usize {
        self.batch_count
    }

    /// The storage layout of this batch
    pub fn layout(&self) -> Layout {
        match self.storage {
            Storage::PerMatrix(_) => Layout::Batched,
            Storage::Packed(_) => {
                if self.inca > 1 {
                    Layout::Interleaved
                } else {
                    Layout::Strided
                }
            }
        }
    }

    /// Offset of the last addressable element plus one, within one instance
    fn extent(&self) -> usize {
        if self.rows == 0 || self.cols == 0 {
            return 0;
        }
        idx2d(self.rows - 1, self.cols - 1, self.inca, self.lda) + 1
    }

    /// Whether distinct batch instances address disjoint memory
    ///
    /// Batched instances are separate `&mut` buffers and cannot alias. For
    /// the packed layouts disjointness is a geometry condition: a strided
    /// batch needs `stride` to clear the per-instance extent, an interleaved
    /// batch needs `inca >= batch_count` so that no two instances land on
    /// the same element slot (given `lda >= rows * inca`).
    pub(crate) fn instances_disjoint(&self) -> bool {
        if self.batch_count <= 1 || self.extent() == 0 {
            return true;
        }
        match &self.storage {
            Storage::PerMatrix(_) => true,
            Storage::Packed(_) => {
                if self.inca > 1 {
                    self.inca >= self.batch_count
                } else {
                    self.stride >= self.extent()
                }
            }
        }
    }

    /// Whether the underlying buffers can hold `rows x cols x batch_count`
    /// under this geometry
    pub(crate) fn has_capacity(&self) -> bool {
        let extent = self.extent();
        if extent == 0 || self.batch_count == 0 {
            return true;
        }
        match &self.storage {
            Storage::PerMatrix(mats) => mats.iter().all(|m| m.len() >= extent),
            Storage::Packed(data) => (self.batch_count - 1) * self.stride + extent <= data.len(),
        }
    }

    /// Build the raw descriptor consumed by kernels
    ///
    /// For the batched layout the per-instance base pointers are materialized
    /// into `ptr_slot` (the pointer-array workspace region), which must hold
    /// at least `batch_count` entries; packed layouts leave it untouched.
    pub(crate) fn raw(&mut self, ptr_slot: &mut [u64]) -> RawBatch<T> {
        match &mut self.storage {
            Storage::PerMatrix(mats) => {
                for (slot, m) in ptr_slot.iter_mut().zip(mats.iter_mut()) {
                    *slot = m.as_mut_ptr() as u64;
                }
                RawBatch {
                    ptrs: ptr_slot.as_ptr(),
                    base: std::ptr::null_mut(),
                    stride: 0,
                    shift: 0,
                    inca: self.inca,
                    lda: self.lda,
                }
            }
            Storage::Packed(data) => RawBatch {
                ptrs: std::ptr::null(),
                base: data.as_mut_ptr(),
                stride: self.stride,
                shift: 0,
                inca: self.inca,
                lda: self.lda,
            },
        }
    }
}

/// A strided batch of per-matrix vectors (pivot indices, Householder scalars)
///
/// Entry `i` of instance `b` lives at `data[b * stride + i]`.
pub struct VecBatchMut<'a, S> {
    pub(crate) data: &'a mut [S],
    pub(crate) stride: usize,
}

impl<'a, S: Copy> VecBatchMut<'a, S> {
    /// Wrap a buffer holding `batch_count` runs of `stride` entries
    pub fn new(data: &'a mut [S], stride: usize) -> Self {
        Self { data, stride }
    }

    /// Whether the buffer holds `count` entries for each of `batch_count`
    /// instances
    pub(crate) fn has_capacity(&self, count: usize, batch_count: usize) -> bool {
        if count == 0 || batch_count == 0 {
            return true;
        }
        self.stride >= count && (batch_count - 1) * self.stride + count <= self.data.len()
    }

    pub(crate) fn raw(&mut self) -> RawVec<S> {
        RawVec {
            base: self.data.as_mut_ptr(),
            stride: self.stride,
            shift: 0,
        }
    }
}

/// Raw batch descriptor: the addressing rule kernels run on
///
/// `ptr(b)` resolves the shifted base of instance `b`; element `(i, j)` is
/// then at `ptr(b).add(i * inca + j * lda)`.
#[derive(Copy, Clone)]
pub(crate) struct RawBatch<T> {
    /// Per-instance base pointers (batched layout), stored as u64; null for
    /// packed layouts
    ptrs: *const u64,
    /// Single base pointer for packed layouts
    base: *mut T,
    /// Elements between instances for packed layouts
    stride: usize,
    /// Element offset applied to every instance (sub-matrix origin)
    shift: usize,
    pub(crate) inca: usize,
    pub(crate) lda: usize,
}

impl<T> RawBatch<T> {
    /// Strided descriptor over a scratch buffer (workspace regions)
    pub(crate) fn packed(base: *mut T, stride: usize, inca: usize, lda: usize) -> Self {
        Self {
            ptrs: std::ptr::null(),
            base,
            stride,
            shift: 0,
            inca,
            lda,
        }
    }

    /// Shifted base pointer of instance `b`
    ///
    /// # Safety
    /// The descriptor must address memory inside the buffers it was built
    /// from, and `b` must be below the batch count those buffers cover.
    #[inline]
    pub(crate) unsafe fn ptr(&self, b: usize) -> *mut T {
        if self.ptrs.is_null() {
            self.base.add(b * self.stride + self.shift)
        } else {
            (*self.ptrs.add(b) as *mut T).add(self.shift)
        }
    }

    /// A view of the same batch with its origin moved by `offset` elements
    #[inline]
    pub(crate) fn shifted(mut self, offset: usize) -> Self {
        self.shift += offset;
        self
    }
}

// Kernels write disjoint per-instance regions when iterating the batch
// dimension in parallel; drivers reject geometry whose instances overlap
// (`instances_disjoint`) before building a descriptor.
unsafe impl<T: Send> Send for RawBatch<T> {}
unsafe impl<T: Send> Sync for RawBatch<T> {}

/// Raw strided-vector descriptor
#[derive(Copy, Clone)]
pub(crate) struct RawVec<S> {
    base: *mut S,
    stride: usize,
    shift: usize,
}

impl<S> RawVec<S> {
    /// Strided descriptor over a scratch buffer
    pub(crate) fn packed(base: *mut S, stride: usize) -> Self {
        Self {
            base,
            stride,
            shift: 0,
        }
    }

    /// Pointer to entry `i` of instance `b`
    ///
    /// # Safety
    /// Same contract as [`RawBatch::ptr`].
    #[inline]
    pub(crate) unsafe fn at(&self, b: usize, i: usize) -> *mut S {
        self.base.add(b * self.stride + self.shift + i)
    }

    /// A view with its per-instance origin moved by `offset` entries
    #[inline]
    pub(crate) fn shifted(mut self, offset: usize) -> Self {
        self.shift += offset;
        self
    }
}

unsafe impl<S: Send> Send for RawVec<S> {}
unsafe impl<S: Send> Sync for RawVec<S> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_tags() {
        let mut a = vec![0.0f64; 12];
        let m = MatrixBatchMut::strided(2, 2, 2, 4, 3, &mut a);
        assert_eq!(m.layout(), Layout::Strided);
        assert_eq!(m.batch_count(), 3);

        let mut b = vec![0.0f64; 12];
        let m = MatrixBatchMut::interleaved(2, 2, 3, 6, 3, &mut b);
        assert_eq!(m.layout(), Layout::Interleaved);

        let mut m0 = vec![0.0f64; 4];
        let mut m1 = vec![0.0f64; 4];
        let m = MatrixBatchMut::batched(2, 2, 2, vec![&mut m0, &mut m1]);
        assert_eq!(m.layout(), Layout::Batched);
        assert_eq!(m.batch_count(), 2);
    }

    #[test]
    fn test_capacity_strided() {
        let mut a = vec![0.0f64; 12];
        assert!(MatrixBatchMut::strided(2, 2, 2, 4, 3, &mut a).has_capacity());
        let mut a = vec![0.0f64; 11];
        assert!(!MatrixBatchMut::strided(2, 2, 2, 4, 3, &mut a).has_capacity());
        // zero-sized problems never need capacity
        let mut a = vec![0.0f64; 0];
        assert!(MatrixBatchMut::strided(0, 2, 2, 4, 3, &mut a).has_capacity());
    }

    #[test]
    fn test_capacity_interleaved() {
        // 2x2, inca = 2 (batch of 2), lda = 4: extent = 1*2 + 1*4 + 1 = 7,
        // plus (bc-1)*1 = 1 -> 8 elements
        let mut a = vec![0.0f64; 8];
        assert!(MatrixBatchMut::interleaved(2, 2, 2, 4, 2, &mut a).has_capacity());
        let mut a = vec![0.0f64; 7];
        assert!(!MatrixBatchMut::interleaved(2, 2, 2, 4, 2, &mut a).has_capacity());
    }

    #[test]
    fn test_instance_disjointness() {
        let mut a = vec![0.0f64; 18];
        // stride covers the extent
        assert!(MatrixBatchMut::strided(3, 3, 3, 9, 2, &mut a).instances_disjoint());
        // stride 0 aliases every instance
        assert!(!MatrixBatchMut::strided(3, 3, 3, 0, 2, &mut a).instances_disjoint());
        // stride shorter than one matrix overlaps the next
        assert!(!MatrixBatchMut::strided(3, 3, 3, 8, 2, &mut a).instances_disjoint());
        // interleaved needs one slot per instance
        assert!(MatrixBatchMut::interleaved(2, 2, 3, 6, 3, &mut a).instances_disjoint());
        assert!(!MatrixBatchMut::interleaved(2, 2, 2, 4, 3, &mut a).instances_disjoint());
        // single instance can never alias itself
        assert!(MatrixBatchMut::strided(3, 3, 3, 0, 1, &mut a).instances_disjoint());
    }

    #[test]
    fn test_raw_addressing() {
        // strided: instance 1 starts at 4
        let mut a: Vec<f64> = (0..8).map(|v| v as f64).collect();
        let mut m = MatrixBatchMut::strided(2, 2, 2, 4, 2, &mut a);
        let raw = m.raw(&mut []);
        unsafe {
            assert_eq!(*raw.ptr(0), 0.0);
            assert_eq!(*raw.ptr(1), 4.0);
            // element (1, 1) of instance 1: 4 + 1 + 2
            assert_eq!(*raw.ptr(1).add(idx2d(1, 1, raw.inca, raw.lda)), 7.0);
            // shifted origin
            let sub = raw.shifted(idx2d(0, 1, raw.inca, raw.lda));
            assert_eq!(*sub.ptr(0), 2.0);
        }
    }

    #[test]
    fn test_raw_batched_ptr_slot() {
        let mut m0: Vec<f64> = vec![1.0, 2.0, 3.0, 4.0];
        let mut m1: Vec<f64> = vec![5.0, 6.0, 7.0, 8.0];
        let mut m = MatrixBatchMut::batched(2, 2, 2, vec![&mut m0, &mut m1]);
        let mut slot = [0u64; 2];
        let raw = m.raw(&mut slot);
        unsafe {
            assert_eq!(*raw.ptr(0), 1.0);
            assert_eq!(*raw.ptr(1), 5.0);
        }
        assert_ne!(slot[0], 0);
        assert_ne!(slot[1], 0);
    }

    #[test]
    fn test_vec_batch_capacity() {
        let mut p = vec![0i32; 6];
        let v = VecBatchMut::new(&mut p, 3);
        assert!(v.has_capacity(3, 2));
        assert!(v.has_capacity(2, 2));
        assert!(!v.has_capacity(4, 2));
        assert!(!v.has_capacity(3, 3));
    }
}
