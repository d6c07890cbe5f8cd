//! Linear solvers.

use std::ffi::c_int;
use log::debug;
use sundials_sys::*;
use crate::{Context, Error, check_ptr, matrix::Matrix};

pub struct LinSolver(SUNLinearSolver);

impl Drop for LinSolver {
    // The returned flag is ignored: nothing can be done about it here.
    // https://sundials.readthedocs.io/en/latest/sunlinsol/SUNLinSol_API_link.html#c.SUNLinSolFree
    fn drop(&mut self) {
        unsafe { SUNLinSolFree(self.0); }
    }
}

impl LinSolver {
    #[inline]
    pub(crate) fn as_ptr(&self) -> SUNLinearSolver {
        self.0
    }

    /// Return a new dense direct linear solver for `mat`.  The vector
    /// `template` is only used to check compatibility.
    ///
    /// # Safety
    /// The return value must not outlive `ctx` and `mat`.
    pub(crate) unsafe fn dense(
        name: &'static str, ctx: &Context, template: N_Vector, mat: &Matrix,
    ) -> Result<Self, Error> {
        let ls = unsafe {
            SUNLinSol_Dense(template, mat.as_ptr(), ctx.as_ptr()) };
        let ls = check_ptr("SUNLinSol_Dense", ls)?;
        debug!("{}: dense linear solver {:?}", name, ls);
        Ok(LinSolver(ls))
    }

    /// Return a new SPGMR iterative linear solver without
    /// preconditioning.  `maxl` is the maximum dimension of the Krylov
    /// subspace, 0 meaning the Sundials default (5).  The vector
    /// `template` is cloned for the workspace.
    ///
    /// # Safety
    /// The return value must not outlive `ctx`.
    pub(crate) unsafe fn spgmr(
        name: &'static str, ctx: &Context, template: N_Vector, maxl: usize,
    ) -> Result<Self, Error> {
        let maxl = maxl.min(c_int::MAX as usize) as c_int;
        let ls = unsafe {
            SUNLinSol_SPGMR(template, SUN_PREC_NONE as _, maxl,
                            ctx.as_ptr()) };
        let ls = check_ptr("SUNLinSol_SPGMR", ls)?;
        debug!("{}: SPGMR linear solver {:?} (maxl = {})", name, ls, maxl);
        Ok(LinSolver(ls))
    }
}
