//! Matrices.

use std::ops::{Index, IndexMut};
use log::debug;
use sundials_sys::*;
use crate::{Context, Error, check_ptr};

pub struct Matrix(SUNMatrix);

impl Drop for Matrix {
    fn drop(&mut self) {
        unsafe { SUNMatDestroy(self.0) }
    }
}

impl Matrix {
    /// Return a new `m` × `n` dense matrix.
    pub(crate) fn dense(
        name: &'static str, ctx: &Context, m: usize, n: usize,
    ) -> Result<Self, Error> {
        let mat = unsafe { SUNDenseMatrix(m as _, n as _, ctx.as_ptr()) };
        let mat = check_ptr("SUNDenseMatrix", mat)?;
        debug!("{}: {}×{} dense matrix {:?}", name, m, n, mat);
        Ok(Matrix(mat))
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> SUNMatrix {
        self.0
    }
}

/// Mutable view of a dense matrix owned by Sundials, as passed to
/// Jacobian functions.  Entries are accessed as `m[(i, j)]` where `i`
/// is the row and `j` the column.
pub struct DenseMut<'a> {
    // Column-major storage.
    data: &'a mut [f64],
    rows: usize,
    cols: usize,
}

impl DenseMut<'_> {
    /// # Safety
    /// `mat` must be a dense matrix that is not accessed by any other
    /// means while the returned value is in use.
    pub(crate) unsafe fn from_sunmatrix<'a>(mat: SUNMatrix) -> DenseMut<'a> {
        let rows = unsafe { SUNDenseMatrix_Rows(mat) } as usize;
        let cols = unsafe { SUNDenseMatrix_Columns(mat) } as usize;
        let ptr = unsafe { SUNDenseMatrix_Data(mat) };
        let data = unsafe { std::slice::from_raw_parts_mut(ptr, rows * cols) };
        DenseMut { data, rows, cols }
    }

    /// Return a view of a column-major buffer of `rows` × `cols` values.
    pub fn from_column_major(data: &mut [f64], rows: usize, cols: usize)
                             -> DenseMut<'_> {
        assert_eq!(data.len(), rows * cols);
        DenseMut { data, rows, cols }
    }

    pub fn rows(&self) -> usize { self.rows }

    pub fn cols(&self) -> usize { self.cols }

    /// Sets all entries to zero.
    pub fn zero(&mut self) {
        self.data.fill(0.)
    }
}

impl Index<(usize, usize)> for DenseMut<'_> {
    type Output = f64;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        assert!(i < self.rows && j < self.cols);
        &self.data[j * self.rows + i]
    }
}

impl IndexMut<(usize, usize)> for DenseMut<'_> {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        assert!(i < self.rows && j < self.cols);
        &mut self.data[j * self.rows + i]
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_major() {
        let mut buf = [0.; 6];
        let mut m = DenseMut::from_column_major(&mut buf, 2, 3);
        m[(1, 2)] = 7.;
        m[(0, 1)] = 3.;
        assert_eq!(m[(1, 2)], 7.);
        assert_eq!((m.rows(), m.cols()), (2, 3));
        assert_eq!(buf, [0., 0., 3., 0., 0., 7.]);
    }

    #[test]
    fn dense_sundials_matrix() {
        let ctx = Context::new().unwrap();
        let mat = Matrix::dense("test", &ctx, 2, 2).unwrap();
        let mut m = unsafe { DenseMut::from_sunmatrix(mat.as_ptr()) };
        m.zero();
        m[(0, 1)] = -100.;
        assert_eq!(m[(0, 1)], -100.);
        assert_eq!(m[(1, 0)], 0.);
    }
}
