//! Tutorial programs for the [Sundials][] ODE solvers CVODE and CVODES.
//!
//! The crate wraps the handful of Sundials objects the tutorials need
//! (context, vectors, matrices, linear solvers and the solver memory)
//! into values that release their resources when dropped.  The
//! programs in `demos/` solve the stiff linear system of
//! [`problem`] with a dense direct solver, the SPGMR iterative solver,
//! several MPI processes (feature `mpi`) and the adjoint method
//! (feature `cvodes`).
//!
//! # Example
//!
//! The following code solves the test system with the BDF method and
//! the SPGMR linear solver.
//!
//! ```
//! use sundials_tutorials::{Context, cvode::CVode, problem};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = Context::new()?;
//! let mut ode = CVode::bdf(ctx, 0., &[2., 1.],
//!     |_, u: &[f64; 2], du: &mut [f64; 2]| problem::rhs(u, du))?
//!     .tolerances(1e-8, 1e-8)?
//!     .spgmr(0)?;
//! let (u, st) = ode.solution(1.);
//! st.check("CVode")?;
//! assert!((u[1] - problem::exact(1.)[1]).abs() < 1e-5);
//! # Ok(()) }
//! ```
//!
//! [Sundials]: https://computing.llnl.gov/projects/sundials

use std::{
    ffi::c_int,
    fmt::Debug,
    ptr,
};
use log::{debug, error};
use sundials_sys::*;

#[cfg(not(any(feature = "cvode", feature = "cvodes")))]
compile_error!("Enable at least one of the features \"cvode\" or \"cvodes\".");

// Both libraries export the `CVode*` symbols with different memory
// layouts, so a single one may be linked.
#[cfg(all(feature = "cvode", feature = "cvodes"))]
compile_error!("The features \"cvode\" and \"cvodes\" are exclusive, \
                use `--no-default-features --features cvodes`.");

/// Check that `$left` and `$right` are the same up to an absolute
/// error of `$tol`.
#[cfg(test)]
macro_rules! assert_eq_tol {
    ($left: expr, $right: expr, $tol: expr) => {
        let left = $left;
        let right = $right;
        let tol = $tol;
        if !((left - right).abs() <= tol) {
            panic!("assertion failed: |left - right| ≤ tol, where\n\
                    - left:  {}\n\
                    - right: {}\n\
                    - tol: {}", left, right, tol);
        }
    }
}

pub mod vector;
pub mod matrix;
pub mod linear_solver;
pub mod cvode;
#[cfg(feature = "cvodes")]
pub mod cvodes;
pub mod problem;
#[cfg(feature = "mpi")]
pub mod parallel;

#[cfg(doctest)]
doc_comment::doctest!("../README.md");

////////////////////////////////////////////////////////////////////////
//
// Error

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The function or method failed with the attached message
    /// (without further details).
    #[error("The function {name} failed with message: {msg}.")]
    Failure { name: &'static str, msg: &'static str },
    /// A Sundials function returned the negative flag `flag`.
    #[error("SUNDIALS_ERROR: {name}() failed with flag = {flag}")]
    Flag { name: &'static str, flag: c_int },
    /// A Sundials constructor returned a NULL pointer.
    #[error("SUNDIALS_ERROR: {name}() failed - returned NULL pointer")]
    NullPointer { name: &'static str },
    /// The integration stopped with a failure status.
    #[error("SUNDIALS_ERROR: {name}() failed with status {status:?}")]
    Status { name: &'static str, status: cvode::CVStatus },
    /// The tutorial system has two components, one per process.
    #[cfg(feature = "mpi")]
    #[error("The communicator has {size} processes but exactly 2 are \
             required")]
    Communicator { size: i32 },
}

/// Check the flag returned by the Sundials function `name`.
/// Negative values signal a failure, which is logged.
pub(crate) fn check_flag(name: &'static str, flag: c_int)
                         -> Result<c_int, Error> {
    if flag < 0 {
        // The CVODE(S) functions have symbolic names for their flags.
        let fname = if name.starts_with("CVode") {
            cvode::return_flag_name(flag)
        } else {
            None
        };
        match fname {
            Some(fname) =>
                error!("SUNDIALS_ERROR: {}() failed with flag = {} ({})",
                       name, flag, fname),
            None =>
                error!("SUNDIALS_ERROR: {}() failed with flag = {}", name, flag),
        }
        Err(Error::Flag { name, flag })
    } else {
        Ok(flag)
    }
}

/// Check the pointer returned by the Sundials constructor `name`.
pub(crate) fn check_ptr<T>(name: &'static str, p: *mut T)
                           -> Result<*mut T, Error> {
    if p.is_null() {
        error!("SUNDIALS_ERROR: {}() failed - returned NULL pointer", name);
        Err(Error::NullPointer { name })
    } else {
        Ok(p)
    }
}

/// Version `(major, minor)` of the Sundials library this crate was
/// built against.
pub fn sundials_version() -> (u32, u32) {
    let major = env!("SUNDIALS_VERSION_MAJOR").parse().unwrap_or(0);
    let minor = env!("SUNDIALS_VERSION_MINOR").parse().unwrap_or(0);
    (major, minor)
}

////////////////////////////////////////////////////////////////////////
//
// SUNContext

/// Context is an object associated with the thread of execution.
/// Each solver takes ownership of its own context.
pub struct Context(SUNContext);

impl Drop for Context {
    fn drop(&mut self) {
        // The MPI variant only uses serial vectors, so the context
        // never holds a communicator and may be freed at any time.
        unsafe { SUNContext_Free(&mut self.0 as *mut _); }
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Context").field(&self.0).finish()
    }
}

impl Context {
    /// Create a new context.
    pub fn new() -> Result<Self, Error> {
        let mut ctx: SUNContext = ptr::null_mut();
        // No communicator (SUN_COMM_NULL).
        let r = unsafe { SUNContext_Create(0 as _, &mut ctx as *mut _) };
        check_flag("SUNContext_Create", r)?;
        check_ptr("SUNContext_Create", ctx)?;
        debug!("Created Sundials context {:?}", ctx);
        Ok(Context(ctx))
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> SUNContext {
        self.0
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_flag_is_an_error() {
        match check_flag("CVodeInit", -22) {
            Err(Error::Flag { name, flag }) => {
                assert_eq!(name, "CVodeInit");
                assert_eq!(flag, -22);
            }
            r => panic!("Flag error expected, got {:?}", r),
        }
    }

    #[test]
    fn nonnegative_flags_pass() {
        assert_eq!(check_flag("CVode", 0).unwrap(), 0);
        assert_eq!(check_flag("CVode", 2).unwrap(), 2);
    }

    #[test]
    fn null_pointers() {
        let p: *mut f64 = ptr::null_mut();
        assert!(matches!(check_ptr("SUNSPGMR", p),
                         Err(Error::NullPointer { name: "SUNSPGMR" })));
        let mut x = 1.;
        assert!(check_ptr("SUNSPGMR", &mut x as *mut f64).is_ok());
    }

    #[test]
    fn error_messages() {
        let e = Error::Flag { name: "CVodeSStolerances", flag: -3 };
        assert_eq!(e.to_string(),
                   "SUNDIALS_ERROR: CVodeSStolerances() failed with flag = -3");
        let e = Error::NullPointer { name: "SUNDenseMatrix" };
        assert_eq!(e.to_string(), "SUNDIALS_ERROR: SUNDenseMatrix() failed \
                                   - returned NULL pointer");
    }

    #[test]
    fn context() {
        let ctx = Context::new().unwrap();
        assert!(!ctx.as_ptr().is_null());
    }

    #[test]
    fn one_integrator_library() {
        assert!(cfg!(feature = "cvode") ^ cfg!(feature = "cvodes"));
    }

    #[test]
    fn version() {
        assert!(sundials_version().0 >= 6);
    }
}
