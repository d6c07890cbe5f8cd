//! Vectors.
//!
//! Rust values are handed to Sundials through `N_Vector` headers that
//! share their storage and, conversely, `N_Vector`s owned by Sundials
//! are seen in callbacks through the views of the [`Vector`] trait.

use std::{mem, slice, marker::PhantomData};
use sundials_sys::*;
use crate::{Error, check_ptr};

pub mod serial;

/// Trait implemented by types that are considered vectors by this
/// library.
///
/// # Safety
/// The views must only be built from serial `N_Vector`s whose length
/// matches the one of `Self`.
pub unsafe trait Vector: Clone {
    /// Rust view of a `N_Vector` owned by Sundials.
    type View<'a>;
    type ViewMut<'a>;

    fn from_nvector<'a>(nv: N_Vector) -> Self::View<'a>;
    fn from_nvector_mut<'a>(nv: N_Vector) -> Self::ViewMut<'a>;

    /// Return a serial `N_Vector` sharing the storage of `self`.
    ///
    /// # Safety
    /// The return value must not outlive `ctx`.  Sundials must not
    /// write through it.
    unsafe fn to_nvector(
        &self, ctx: SUNContext) -> Result<SharedSerial<&Self>, Error>;

    /// Return a serial `N_Vector` sharing the storage of `self` that
    /// Sundials may write to.
    ///
    /// # Safety
    /// The return value must not outlive `ctx`.
    unsafe fn to_nvector_mut(
        &mut self, ctx: SUNContext) -> Result<SharedSerial<&mut Self>, Error>;

    /// Length of the vector.
    fn len(&self) -> usize;
}

/// N_Vector serial wrapper whose "content" field is shared with a
/// Rust value.  This is used internally to convert Rust values to
/// appropriate input/outputs for Sundials routines.
pub struct SharedSerial<V> {
    nv: N_Vector,
    marker: PhantomData<V>, // Lifetime of the Rust vector
}

impl<V> Drop for SharedSerial<V> {
    fn drop(&mut self) {
        // `N_VDestroy_Serial` only frees the data if
        // `content->own_data` is true, which `N_VMake_Serial` sets
        // to false.
        unsafe { N_VDestroy_Serial(self.nv) };
    }
}

impl<V> SharedSerial<V> {
    /// # Safety
    /// `data` must point to `len` values that outlive the return value.
    unsafe fn make(
        data: *mut f64, len: usize, ctx: SUNContext
    ) -> Result<Self, Error> {
        let nv = unsafe { N_VMake_Serial(len as _, data, ctx) };
        let nv = check_ptr("N_VMake_Serial", nv)?;
        Ok(SharedSerial { nv, marker: PhantomData })
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> N_Vector {
        self.nv
    }
}

#[inline]
fn data_of(nv: N_Vector) -> *mut f64 {
    let ptr = unsafe { N_VGetArrayPointer_Serial(nv) };
    // Same requirements as `std::slice::from_raw_parts`.
    debug_assert_eq!(0, (ptr as usize).rem_euclid(mem::align_of::<f64>()));
    ptr
}

unsafe impl<const N: usize> Vector for [f64; N] {
    type View<'a> = &'a [f64; N];
    type ViewMut<'a> = &'a mut [f64; N];

    #[inline]
    fn from_nvector<'a>(nv: N_Vector) -> &'a Self {
        debug_assert_eq!(unsafe { N_VGetLength_Serial(nv) } as usize, N);
        unsafe { &*(data_of(nv) as *const [f64; N]) }
    }

    #[inline]
    fn from_nvector_mut<'a>(nv: N_Vector) -> &'a mut Self {
        debug_assert_eq!(unsafe { N_VGetLength_Serial(nv) } as usize, N);
        unsafe { &mut *(data_of(nv) as *mut [f64; N]) }
    }

    #[inline]
    unsafe fn to_nvector(
        &self, ctx: SUNContext
    ) -> Result<SharedSerial<&Self>, Error> {
        unsafe { SharedSerial::make(self.as_ptr() as *mut _, N, ctx) }
    }

    #[inline]
    unsafe fn to_nvector_mut(
        &mut self, ctx: SUNContext
    ) -> Result<SharedSerial<&mut Self>, Error> {
        unsafe { SharedSerial::make(self.as_mut_ptr(), N, ctx) }
    }

    #[inline]
    fn len(&self) -> usize { N }
}

// It is not possible to reconstruct a `Vec<f64>` from a `N_Vector`
// because we do not own the data that Sundials gives us, thus the
// views are slices.
unsafe impl Vector for Vec<f64> {
    type View<'a> = &'a [f64];
    type ViewMut<'a> = &'a mut [f64];

    #[inline]
    fn from_nvector<'a>(nv: N_Vector) -> &'a [f64] {
        let n = unsafe { N_VGetLength_Serial(nv) };
        unsafe { slice::from_raw_parts(data_of(nv), n as _) }
    }

    #[inline]
    fn from_nvector_mut<'a>(nv: N_Vector) -> &'a mut [f64] {
        let n = unsafe { N_VGetLength_Serial(nv) };
        unsafe { slice::from_raw_parts_mut(data_of(nv), n as _) }
    }

    #[inline]
    unsafe fn to_nvector(
        &self, ctx: SUNContext
    ) -> Result<SharedSerial<&Self>, Error> {
        unsafe {
            SharedSerial::make(self.as_ptr() as *mut _, self.len(), ctx) }
    }

    #[inline]
    unsafe fn to_nvector_mut(
        &mut self, ctx: SUNContext
    ) -> Result<SharedSerial<&mut Self>, Error> {
        let n = self.len();
        unsafe { SharedSerial::make(self.as_mut_ptr(), n, ctx) }
    }

    #[inline]
    fn len(&self) -> usize { Vec::len(self) }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::Context;

    #[test]
    fn array_shares_storage() {
        let ctx = Context::new().unwrap();
        let mut y = [2., 1.];
        {
            let nv = unsafe { y.to_nvector_mut(ctx.as_ptr()) }.unwrap();
            let v = <[f64; 2]>::from_nvector_mut(nv.as_ptr());
            v[1] = 5.;
            assert_eq!(<[f64; 2]>::from_nvector(nv.as_ptr()), &[2., 5.]);
        }
        assert_eq!(y, [2., 5.]);
    }

    #[test]
    fn vec_views() {
        let ctx = Context::new().unwrap();
        let y = vec![1., 2., 3.];
        let nv = unsafe { y.to_nvector(ctx.as_ptr()) }.unwrap();
        assert_eq!(Vec::<f64>::from_nvector(nv.as_ptr()), &[1., 2., 3.]);
        assert_eq!(Vector::len(&y), 3);
    }
}
