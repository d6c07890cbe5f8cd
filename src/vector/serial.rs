//! Sundials serial N_Vectors.

use std::marker::PhantomData;
use sundials_sys::*;
use crate::{Context, Error, check_ptr};

/// Serial `N_Vector` whose data is allocated and owned by Sundials.
/// It cannot outlive the [`Context`] it was created with.
pub struct Serial<'a> {
    nv: N_Vector,
    ctx: PhantomData<&'a Context>,
}

impl Drop for Serial<'_> {
    fn drop(&mut self) {
        unsafe { N_VDestroy_Serial(self.nv) }
    }
}

impl<'a> Serial<'a> {
    /// Return a new vector of length `len` filled with zeros.
    pub fn new(ctx: &'a Context, len: usize) -> Result<Self, Error> {
        let nv = unsafe { N_VNew_Serial(len as _, ctx.as_ptr()) };
        let nv = check_ptr("N_VNew_Serial", nv)?;
        unsafe { N_VConst_Serial(0., nv) };
        Ok(Serial { nv, ctx: PhantomData })
    }

    pub fn len(&self) -> usize {
        unsafe { N_VGetLength_Serial(self.nv) as _ }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> N_Vector {
        self.nv
    }
}

impl AsRef<[f64]> for Serial<'_> {
    fn as_ref(&self) -> &[f64] {
        <Vec<f64> as super::Vector>::from_nvector(self.nv)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_zero() {
        let ctx = Context::new().unwrap();
        let v = Serial::new(&ctx, 2).unwrap();
        assert_eq!(v.len(), 2);
        assert!(!v.is_empty());
        assert_eq!(v.as_ref(), &[0., 0.]);
    }
}
