//! `CVode` is a solver for stiff and nonstiff ODE systems ẏ = f(t,y)
//! with root detection.  Based on Adams and BDF methods.
//!
//! # Example
//!
//! ```
//! use sundials_tutorials::{Context, cvode::CVode, problem};
//! let ctx = Context::new()?;
//! let mut ode = CVode::bdf(ctx, 0., &[2., 1.],
//!     |_, u: &[f64; 2], du: &mut [f64; 2]| problem::rhs(u, du))?
//!     .jacobian(|_, _, _, j| problem::jacobian(j))?;
//! let (u1, st) = ode.solution(0.5);
//! st.check("CVode")?;
//! assert!(u1[0] < 0.);
//! # Ok::<(), sundials_tutorials::Error>(())
//! ```

use std::{
    ffi::{CStr, c_int, c_long, c_void},
    fmt::{self, Display, Formatter},
    panic::{self, AssertUnwindSafe},
    pin::Pin,
    marker::PhantomData,
    ptr,
};
use log::{debug, error, log_enabled, Level};
use sundials_sys::*;
use crate::{
    Context,
    Error,
    check_flag,
    check_ptr,
    vector::{Vector, serial::Serial},
    matrix::{Matrix, DenseMut},
    linear_solver::LinSolver,
};

// Implement the Drop trait only on the pointer to be able to move
// values out of the structure `CVode`.
#[derive(Debug)]
pub(crate) struct CVodeMem(pub(crate) *mut c_void);

impl Drop for CVodeMem {
    fn drop(&mut self) { unsafe { CVodeFree(&mut self.0) } }
}

impl CVodeMem {
    pub(crate) fn new(lmm: c_int, ctx: &Context) -> Result<Self, Error> {
        let mem = unsafe { CVodeCreate(lmm, ctx.as_ptr()) };
        Ok(CVodeMem(check_ptr("CVodeCreate", mem)?))
    }
}

/// Linear solver together with its matrix (if any).
pub(crate) struct Linear {
    pub(crate) solver: LinSolver,
    // Declared after `solver` so the solver is freed first.
    pub(crate) matrix: Option<Matrix>,
}

impl Linear {
    /// Dense direct solver for a system of dimension `n`.
    pub(crate) fn dense(
        name: &'static str, ctx: &Context, n: usize
    ) -> Result<Self, Error> {
        let template = Serial::new(ctx, n)?;
        let matrix = Matrix::dense(name, ctx, n, n)?;
        let solver = unsafe {
            LinSolver::dense(name, ctx, template.as_ptr(), &matrix)? };
        Ok(Linear { solver, matrix: Some(matrix) })
    }

    /// Matrix-free SPGMR solver for a system of dimension `n`.
    pub(crate) fn spgmr(
        name: &'static str, ctx: &Context, n: usize, maxl: usize,
    ) -> Result<Self, Error> {
        let template = Serial::new(ctx, n)?;
        let solver = unsafe {
            LinSolver::spgmr(name, ctx, template.as_ptr(), maxl)? };
        Ok(Linear { solver, matrix: None })
    }

    #[inline]
    pub(crate) fn matrix_ptr(&self) -> SUNMatrix {
        self.matrix.as_ref().map_or(ptr::null_mut(), |m| m.as_ptr())
    }

    pub(crate) fn is_iterative(&self) -> bool {
        self.matrix.is_none()
    }
}

/// Create a solver memory, initialize it with `f` and `y0` at `t0`
/// and attach the tolerances and a dense linear solver.
#[allow(clippy::too_many_arguments)]
pub(crate) fn create<V: Vector>(
    name: &'static str, lmm: c_int, ctx: &Context,
    t0: f64, y0: &V, f: CVRhsFn, rtol: f64, atol: f64,
) -> Result<(CVodeMem, Linear), Error> {
    let cvode_mem = CVodeMem::new(lmm, ctx)?;
    // SAFETY: Once `y0` has been passed to `CVodeInit`, it is copied
    // to internal structures and thus can be freed.
    let nvy0 = unsafe { y0.to_nvector(ctx.as_ptr())? };
    check_flag("CVodeInit", unsafe {
        CVodeInit(cvode_mem.0, f, t0, nvy0.as_ptr()) })?;
    drop(nvy0);
    // Set tolerances (otherwise the solver will complain).
    check_flag("CVodeSStolerances", unsafe {
        CVodeSStolerances(cvode_mem.0, rtol, atol) })?;
    let linear = Linear::dense(name, ctx, y0.len())?;
    check_flag("CVodeSetLinearSolver", unsafe {
        CVodeSetLinearSolver(cvode_mem.0, linear.solver.as_ptr(),
                             linear.matrix_ptr()) })?;
    Ok((cvode_mem, linear))
}

/// Symbolic name (e.g. `CV_ILL_INPUT`) of a flag returned by a CVODE
/// function.
pub(crate) fn return_flag_name(flag: c_int) -> Option<String> {
    let p = unsafe { CVodeGetReturnFlagName(flag as c_long) };
    if p.is_null() {
        return None
    }
    let name = unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned();
    // The string is allocated with `malloc`.
    unsafe { libc::free(p as *mut libc::c_void) };
    Some(name)
}

/// Run the user callback `f` on behalf of Sundials.  Unwinding into C
/// is undefined behavior, so a panic aborts the program.
pub(crate) fn callback(name: &str, f: impl FnOnce()) -> c_int {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => 0,
        Err(e) => {
            let msg = e.downcast_ref::<&str>().map(|s| s.to_string())
                .or_else(|| e.downcast_ref::<String>().cloned())
                .unwrap_or_default();
            if log_enabled!(Level::Error) {
                error!("sundials_tutorials: {} panicked: {}", name, msg);
            } else {
                eprintln!("sundials_tutorials: {} panicked: {}", name, msg);
            }
            std::process::abort() // Doesn't unwind
        }
    }
}

/// Solver for stiff and nonstiff initial value problems for ODE systems.
///
/// The generic parameters are as follows: `V` is the type of vectors,
/// `F` the type of the function being used as right-hand side of the
/// ODE, `J` the type of the Jacobian (or Jacobian-times-vector)
/// function supplied by the user (if any) and `G` is the type of the
/// functions (if any) of which we want to seek roots.
pub struct CVode<V, F, J = (), G = ()>
where V: Vector {
    cvode_mem: CVodeMem,
    // Freed after `cvode_mem` which refers to it.
    linear: Linear,
    user_data: Pin<Box<UserData<F, J, G>>>,
    t0: f64,
    tret: f64,
    n: usize,
    vec: PhantomData<V>,
    rtol: f64,
    atol: f64,
    rootsfound: Vec<c_int>, // cache, with len() == number of eq
    // One must take ownership of the context because it can only be
    // used in a single ODE solver.  Dropped last.
    ctx: Context,
}

// The user-data may be updated according to the types of `J` and `G`.
// However, we must ensure that `f: F` is always extracted in the same
// way because `cvrhs` may only be passed during initialization.
// Similarly, the offset of `j` only depends on `F` and `J`, so it is
// not affected by a later change of `G`.
#[repr(C)]
struct UserData<F, J, G> {
    f: F, // Right-hand side of the equation
    j: J, // Jacobian or Jacobian-times-vector function (if any)
    g: G, // Function whose roots we want to compute (if any)
}

impl<V, F, J, G> CVode<V, F, J, G>
where V: Vector
{
    /// Return a reference to the [`Context`] the CVode solver was
    /// built with.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    #[allow(clippy::too_many_arguments)]
    fn new_with_fn<J1, G1>(
        ctx: Context, cvode_mem: CVodeMem, linear: Linear,
        t0: f64, tret: f64, n: usize, rtol: f64, atol: f64,
        f: F, j: J1, g: G1, ng: usize,
    ) -> Result<CVode<V, F, J1, G1>, Error> {
        let user_data = Box::pin(UserData { f, j, g });
        let user_data_ptr =
            user_data.as_ref().get_ref() as *const _ as *mut c_void;
        let ode = CVode {
            cvode_mem, linear, user_data,
            t0, tret, n, vec: PhantomData,
            rtol, atol,
            rootsfound: vec![0; ng],
            ctx,
        };
        check_flag("CVodeSetUserData", unsafe {
            CVodeSetUserData(ode.cvode_mem.0, user_data_ptr) })?;
        Ok(ode)
    }
}

impl<V, F> CVode<V, F, (), ()>
where V: Vector,
      F: FnMut(f64, V::View<'_>, V::ViewMut<'_>)
{
    /// Callback for the right-hand side of the equation.
    extern "C" fn cvrhs(t: f64, nvy: N_Vector, nvdy: N_Vector,
                        user_data: *mut c_void
    ) -> c_int {
        callback("right-hand side function", || {
            // Get f from user_data, whatever the types of j and g.
            let y = V::from_nvector(nvy);
            let dy = V::from_nvector_mut(nvdy);
            let u = unsafe { &mut *(user_data as *mut UserData<F, (), ()>) };
            (u.f)(t, y, dy);
        })
    }

    /// Initialize a CVode with method `llm`.
    fn init(
        name: &'static str, lmm: c_int,
        // Take the context by move so only one solver can have it at
        // a given time.
        ctx: Context, t0: f64, y0: &V, f: F
    ) -> Result<Self, Error> {
        let rtol = 1e-6;
        let atol = 1e-12;
        let (cvode_mem, linear) = create(
            name, lmm, &ctx, t0, y0, Some(Self::cvrhs), rtol, atol)?;
        let n = y0.len();
        debug!("{}: initialized with {} equations at t0 = {}", name, n, t0);
        Self::new_with_fn(
            ctx, cvode_mem, linear, t0, t0, n, rtol, atol,
            f, (), (), 0)
    }

    /// Solver using the Adams linear multistep method.  Recommended
    /// for non-stiff problems.
    pub fn adams(ctx: Context, t0: f64, y0: &V, f: F) -> Result<Self, Error> {
        Self::init("CVode::adams", CV_ADAMS as _, ctx, t0, y0, f)
    }

    /// Solver using the BDF linear multistep method with Newton
    /// iterations.  Recommended for stiff problems.
    pub fn bdf(ctx: Context, t0: f64, y0: &V, f: F) -> Result<Self, Error> {
        Self::init("CVode::bdf", CV_BDF as _, ctx, t0, y0, f)
    }
}

/// # Optional inputs
impl<V, F, J, G> CVode<V, F, J, G>
where V: Vector {
    /// Set the scalar relative tolerance `rtol` and absolute
    /// tolerance `atol`.
    pub fn tolerances(mut self, rtol: f64, atol: f64) -> Result<Self, Error> {
        check_flag("CVodeSStolerances", unsafe {
            CVodeSStolerances(self.cvode_mem.0, rtol, atol) })?;
        self.rtol = rtol;
        self.atol = atol;
        Ok(self)
    }

    pub fn rtol(self, rtol: f64) -> Result<Self, Error> {
        let atol = self.atol;
        self.tolerances(rtol, atol)
    }

    pub fn atol(self, atol: f64) -> Result<Self, Error> {
        let rtol = self.rtol;
        self.tolerances(rtol, atol)
    }

    /// Set the maximum order of the method.  It must be positive and
    /// at most 12 for Adams, 5 for BDF.
    pub fn maxord(self, o: u8) -> Result<Self, Error> {
        check_flag("CVodeSetMaxOrd", unsafe {
            CVodeSetMaxOrd(self.cvode_mem.0, o as _) })?;
        Ok(self)
    }

    /// Specify the maximum number of steps to be taken by the solver
    /// in its attempt to reach the next output time.  Default: 500.
    pub fn mxsteps(self, n: usize) -> Result<Self, Error> {
        let n =
            if n <= c_long::MAX as usize { n as _ } else { c_long::MAX };
        check_flag("CVodeSetMaxNumSteps", unsafe {
            CVodeSetMaxNumSteps(self.cvode_mem.0, n) })?;
        Ok(self)
    }

    /// Specifies the value `tstop` of the independent variable t past
    /// which the solution is not to proceed.
    pub fn set_tstop(&mut self, tstop: f64) -> Result<(), Error> {
        check_flag("CVodeSetStopTime", unsafe {
            CVodeSetStopTime(self.cvode_mem.0, tstop) })?;
        Ok(())
    }

    /// Specifies the maximum number of messages issued by the solver
    /// warning that t + h = t on the next internal step.
    pub fn max_hnil_warns(self, n: usize) -> Result<Self, Error> {
        let n = n.min(c_int::MAX as usize);
        check_flag("CVodeSetMaxHnilWarns", unsafe {
            CVodeSetMaxHnilWarns(self.cvode_mem.0, n as _) })?;
        Ok(self)
    }
}

/// # Linear solvers
///
/// The linear solver can only be changed before a Jacobian function
/// is given because attaching a linear solver resets it.
impl<V, F, G> CVode<V, F, (), G>
where V: Vector {
    fn set_linear(mut self, linear: Linear) -> Result<Self, Error> {
        check_flag("CVodeSetLinearSolver", unsafe {
            CVodeSetLinearSolver(self.cvode_mem.0, linear.solver.as_ptr(),
                                 linear.matrix_ptr()) })?;
        // The previous solver is freed once detached.
        self.linear = linear;
        Ok(self)
    }

    /// Use the scaled preconditioned GMRES iterative solver (without
    /// preconditioning) for the Newton iterations.  `maxl` is the
    /// maximum dimension of the Krylov subspace, 0 meaning the
    /// Sundials default.  Unless [`CVode::jac_times`] is used, the
    /// Jacobian-times-vector products are approximated by difference
    /// quotients.
    pub fn spgmr(self, maxl: usize) -> Result<Self, Error> {
        let linear = Linear::spgmr("CVode::spgmr", &self.ctx, self.n, maxl)?;
        self.set_linear(linear)
    }

    /// Use the dense direct linear solver (the default).  Unless
    /// [`CVode::jacobian`] is used, the Jacobian is approximated by
    /// difference quotients.
    pub fn dense(self) -> Result<Self, Error> {
        let linear = Linear::dense("CVode::dense", &self.ctx, self.n)?;
        self.set_linear(linear)
    }
}

/// # User supplied Jacobian
impl<V, F> CVode<V, F, (), ()>
where V: Vector,
      F: Unpin
{
    /// Callback for the dense Jacobian.
    extern "C" fn cvjac<J1>(
        t: f64, y: N_Vector, fy: N_Vector, jac: SUNMatrix,
        user_data: *mut c_void,
        _tmp1: N_Vector, _tmp2: N_Vector, _tmp3: N_Vector,
    ) -> c_int
    where J1: FnMut(f64, V::View<'_>, V::View<'_>, &mut DenseMut<'_>) {
        callback("Jacobian function", || {
            let u = unsafe { &mut *(user_data as *mut UserData<F, J1, ()>) };
            let mut m = unsafe { DenseMut::from_sunmatrix(jac) };
            (u.j)(t, V::from_nvector(y), V::from_nvector(fy), &mut m);
        })
    }

    /// Callback for the Jacobian-times-vector product.
    extern "C" fn cvjtimes<J1>(
        v: N_Vector, jv: N_Vector, t: f64, y: N_Vector, _fy: N_Vector,
        user_data: *mut c_void, _tmp: N_Vector,
    ) -> c_int
    where J1: FnMut(f64, V::View<'_>, V::View<'_>, V::ViewMut<'_>) {
        callback("Jacobian-times-vector function", || {
            let u = unsafe { &mut *(user_data as *mut UserData<F, J1, ()>) };
            (u.j)(t, V::from_nvector(y), V::from_nvector(v),
                  V::from_nvector_mut(jv));
        })
    }

    fn with_j<J1: Unpin>(self, j: J1) -> Result<CVode<V, F, J1, ()>, Error> {
        let u = *Pin::into_inner(self.user_data);
        Self::new_with_fn(
            self.ctx, self.cvode_mem, self.linear,
            self.t0, self.tret, self.n, self.rtol, self.atol,
            u.f, j, (), 0)
    }

    /// Use `j`(t, y, f(t,y), J) to set the entries of the Jacobian
    /// J = ∂f/∂y of the right-hand side.  The entries of J are zero
    /// on entry.  Requires the dense linear solver.
    pub fn jacobian<J1>(self, j: J1) -> Result<CVode<V, F, J1, ()>, Error>
    where J1: FnMut(f64, V::View<'_>, V::View<'_>, &mut DenseMut<'_>)
              + Unpin {
        if self.linear.is_iterative() {
            return Err(Error::Failure {
                name: "CVode::jacobian",
                msg: "a Jacobian function requires a dense linear solver" })
        }
        let ode = self.with_j(j)?;
        check_flag("CVodeSetJacFn", unsafe {
            CVodeSetJacFn(ode.cvode_mem.0, Some(Self::cvjac::<J1>)) })?;
        Ok(ode)
    }

    /// Use `jv`(t, y, v, Jv) to compute the product Jv of the Jacobian
    /// J = ∂f/∂y at (t, y) with the vector v.  Requires an iterative
    /// linear solver such as [`CVode::spgmr`].
    pub fn jac_times<J1>(self, jv: J1) -> Result<CVode<V, F, J1, ()>, Error>
    where J1: FnMut(f64, V::View<'_>, V::View<'_>, V::ViewMut<'_>)
              + Unpin {
        if !self.linear.is_iterative() {
            return Err(Error::Failure {
                name: "CVode::jac_times",
                msg: "a Jacobian-times-vector function requires an \
                      iterative linear solver" })
        }
        let ode = self.with_j(jv)?;
        check_flag("CVodeSetJacTimes", unsafe {
            CVodeSetJacTimes(ode.cvode_mem.0, None,
                             Some(Self::cvjtimes::<J1>)) })?;
        Ok(ode)
    }
}

/// # Root-finding capabilities
impl<V, F, J, G> CVode<V, F, J, G>
where V: Vector,
      F: Unpin,
      J: Unpin,
      G: Unpin
{
    /// Callback for the root-finding callback for `N` functions,
    /// where `N` is known at compile time.
    extern "C" fn cvroot1<const N: usize, G1>(
        t: f64, y: N_Vector, gout: *mut f64, user_data: *mut c_void) -> c_int
    where G1: FnMut(f64, V::View<'_>, &mut [f64; N]) {
        callback("function passed to .root()", || {
            let u = unsafe { &mut *(user_data as *mut UserData<F, J, G1>) };
            let out = unsafe { &mut *(gout as *mut [f64; N]) };
            (u.g)(t, V::from_nvector(y), out);
        })
    }

    /// Specifies that the roots of a set of functions gᵢ(t, y),
    /// 0 ≤ `i` < `M` (given by `g`(t,y, [g₁,...,gₘ])) are to be
    /// found while the IVP is being solved.
    pub fn root<const M: usize, G1>(self, g: G1)
                                    -> Result<CVode<V, F, J, G1>, Error>
    where G1: FnMut(f64, V::View<'_>, &mut [f64; M]) {
        check_flag("CVodeRootInit", unsafe {
            CVodeRootInit(self.cvode_mem.0, M as _,
                          Some(Self::cvroot1::<M, G1>)) })?;
        let u = *Pin::into_inner(self.user_data);
        Self::new_with_fn(
            self.ctx, self.cvode_mem, self.linear,
            self.t0, self.tret, self.n, self.rtol, self.atol,
            u.f, u.j, g, M)
    }
}


/// Return value of [`CVode::solve`] and [`CVode::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum CVStatus {
    Ok,
    /// Succeeded by reaching the stopping point specified through
    /// [`CVode::set_tstop`].
    Tstop(f64),
    Root(f64, Vec<bool>),
    IllInput,
    /// The initial time `t0` and the output time `t` are too close to
    /// each other and the user did not specify an initial step size.
    TooClose,
    /// The solver took `mxstep` internal steps but could not reach the
    /// final time.
    TooMuchWork,
    /// The solver could not satisfy the accuracy demanded by the user
    /// for some internal step.
    TooMuchAcc,
    ErrFailure,
    ConvFailure,
    /// The linear solver initialization failed.
    LinitFail,
    /// The linear solver setup failed.
    LsetupFail,
    /// The linear solver solve failed.
    LsolveFail,
    /// Any other (negative) return flag.
    Other(c_int),
}

impl CVStatus {
    pub(crate) fn of_flag(r: c_int, tret: f64,
                          rootsfound: impl FnOnce() -> Vec<bool>) -> Self {
        match r {
            CV_SUCCESS => CVStatus::Ok,
            CV_TSTOP_RETURN => CVStatus::Tstop(tret),
            CV_ROOT_RETURN => CVStatus::Root(tret, rootsfound()),
            CV_ILL_INPUT => CVStatus::IllInput,
            CV_TOO_MUCH_WORK => CVStatus::TooMuchWork,
            CV_TOO_MUCH_ACC => CVStatus::TooMuchAcc,
            CV_ERR_FAILURE => CVStatus::ErrFailure,
            CV_CONV_FAILURE => CVStatus::ConvFailure,
            CV_LINIT_FAIL => CVStatus::LinitFail,
            CV_LSETUP_FAIL => CVStatus::LsetupFail,
            CV_LSOLVE_FAIL => CVStatus::LsolveFail,
            CV_TOO_CLOSE => CVStatus::TooClose,
            _ => CVStatus::Other(r),
        }
    }

    /// Whether the solver reached the requested time (or stopped at a
    /// root or the stop time).
    pub fn is_ok(&self) -> bool {
        matches!(self, CVStatus::Ok | CVStatus::Tstop(_) | CVStatus::Root(..))
    }

    /// Return an error (and log it) if the status, returned by the
    /// function `name`, is a failure.
    pub fn check(&self, name: &'static str) -> Result<(), Error> {
        if self.is_ok() {
            Ok(())
        } else {
            error!("SUNDIALS_ERROR: {}() failed with status {:?}", name, self);
            Err(Error::Status { name, status: self.clone() })
        }
    }
}

/// # Solving the IVP
impl<V, F, J, G> CVode<V, F, J, G>
where V: Vector
{
    /// Set `y` to the solution at time `t`.
    ///
    /// If this function returns [`CVStatus::IllInput`], it means that
    /// - `t` was not monotonic w.r.t. previous calls.
    /// - A component of the error weight vector became zero during
    ///   internal time-stepping.
    /// - A root of one of the root functions was found both at a point `t`
    ///   and also very near `t`.
    pub fn solve(&mut self, t: f64, y: &mut V) -> CVStatus {
        Self::integrate(self, t, y, CV_NORMAL as _)
    }

    /// Same as [`CVode::solve`] but only perform one time step in the
    /// direction of `t`.
    pub fn step(&mut self, t: f64, y: &mut V) -> CVStatus {
        Self::integrate(self, t, y, CV_ONE_STEP as _)
    }

    fn integrate(&mut self, t: f64, y: &mut V, itask: c_int) -> CVStatus {
        // Safety: `yout` does not escape this function and so will
        // not outlive `self.ctx`.
        let yout = match unsafe { y.to_nvector_mut(self.ctx.as_ptr()) } {
            Ok(yout) => yout,
            Err(_) => return CVStatus::Other(CV_MEM_FAIL),
        };
        let mut tret = self.tret;
        let r = unsafe { CVode(
            self.cvode_mem.0,
            t,
            yout.as_ptr(),
            &mut tret, itask) };
        self.tret = tret;
        let mem = self.cvode_mem.0;
        let rootsfound = &mut self.rootsfound;
        CVStatus::of_flag(r, tret, || {
            let ret = unsafe { CVodeGetRootInfo(mem, rootsfound.as_mut_ptr()) };
            debug_assert_eq!(ret, CV_SUCCESS);
            rootsfound.iter().map(|&g| g != 0).collect()
        })
    }

    /// Time reached by the last call to [`CVode::solve`] or
    /// [`CVode::step`] (the initial time if none).
    pub fn time(&self) -> f64 {
        self.tret
    }

    /// Initial time of the problem.
    pub fn t0(&self) -> f64 {
        self.t0
    }

    /// Integrator statistics.
    pub fn stats(&self) -> Result<Stats, Error> {
        Stats::of_mem(self.cvode_mem.0)
    }
}

impl<const N: usize, F, J, G> CVode<[f64; N], F, J, G> {
    /// Return the solution at time `t`.
    pub fn solution(&mut self, t: f64) -> ([f64; N], CVStatus) {
        let mut y = [f64::NAN; N];
        let cv = self.solve(t, &mut y);
        (y, cv)
    }
}

/// Counters and step information of a solver.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    pub steps: usize,
    pub rhs_evals: usize,
    pub lin_solv_setups: usize,
    pub err_test_fails: usize,
    pub nonlin_iters: usize,
    pub nonlin_conv_fails: usize,
    pub jac_evals: usize,
    pub lin_iters: usize,
    pub jtimes_evals: usize,
    pub last_step: f64,
    pub current_time: f64,
}

impl Stats {
    pub(crate) fn of_mem(mem: *mut c_void) -> Result<Self, Error> {
        macro_rules! count { ($f: ident) => {{
            let mut n: c_long = 0;
            check_flag(stringify!($f), unsafe { $f(mem, &mut n) })?;
            n as usize
        }}}
        let mut last_step = 0.;
        check_flag("CVodeGetLastStep", unsafe {
            CVodeGetLastStep(mem, &mut last_step) })?;
        let mut current_time = 0.;
        check_flag("CVodeGetCurrentTime", unsafe {
            CVodeGetCurrentTime(mem, &mut current_time) })?;
        Ok(Stats {
            steps: count!(CVodeGetNumSteps),
            rhs_evals: count!(CVodeGetNumRhsEvals),
            lin_solv_setups: count!(CVodeGetNumLinSolvSetups),
            err_test_fails: count!(CVodeGetNumErrTestFails),
            nonlin_iters: count!(CVodeGetNumNonlinSolvIters),
            nonlin_conv_fails: count!(CVodeGetNumNonlinSolvConvFails),
            jac_evals: count!(CVodeGetNumJacEvals),
            lin_iters: count!(CVodeGetNumLinIters),
            jtimes_evals: count!(CVodeGetNumJtimesEvals),
            last_step,
            current_time,
        })
    }
}

impl Display for Stats {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Final Statistics:")?;
        writeln!(f, "nst = {:<6} nfe  = {:<6} nsetups = {:<6} netf = {}",
                 self.steps, self.rhs_evals, self.lin_solv_setups,
                 self.err_test_fails)?;
        writeln!(f, "nni = {:<6} ncfn = {:<6} nje     = {:<6} nli  = {}",
                 self.nonlin_iters, self.nonlin_conv_fails, self.jac_evals,
                 self.lin_iters)?;
        write!(f, "njtv = {:<5} hlast = {:e} tcur = {}",
               self.jtimes_evals, self.last_step, self.current_time)
    }
}



#[cfg(test)]
mod tests {
    use sundials_sys::{CV_ILL_INPUT, CV_TOO_MUCH_WORK};
    use crate::{Context, Error, problem, cvode::{CVode, CVStatus}};

    fn rhs(_: f64, u: &[f64; 2], du: &mut [f64; 2]) {
        problem::rhs(u, du)
    }

    #[test]
    fn cvode_zero_time_step() {
        let ctx = Context::new().unwrap();
        let mut ode = CVode::adams(ctx, 0., &[0.],
            |_, _, du: &mut [f64; 1]| *du = [1.]).unwrap();
        let mut u1 = [f64::NAN];
        let cv = ode.solve(0., &mut u1);
        assert_eq!(cv, CVStatus::TooClose);
        assert!(matches!(cv.check("CVode"), Err(Error::Status { .. })));
    }

    #[test]
    fn cvode_solution() {
        let ctx = Context::new().unwrap();
        let mut ode = CVode::adams(ctx, 0., &[0.],
            |_, _, du: &mut [f64; 1]| *du = [1.]).unwrap();
        assert_eq!(ode.solution(1.).0, [1.]);
        assert_eq!(ode.time(), 1.);
    }

    #[test]
    fn cvode_exp() {
        let ctx = Context::new().unwrap();
        let mut ode = CVode::adams(ctx, 0., &[1.],
            |_, u: &[f64; 1], du: &mut [f64; 1]| *du = *u).unwrap()
            .tolerances(1e-8, 1e-10).unwrap();
        let mut u1 = [f64::NAN];
        ode.solve(1., &mut u1);
        assert_eq_tol!(u1[0], 1f64.exp(), 1e-5);
    }

    #[test]
    fn cvode_vec() {
        let ctx = Context::new().unwrap();
        let mut ode = CVode::adams(ctx, 0., &vec![0.],
            |_, _, du: &mut [f64]| du[0] = 1.).unwrap();
        let mut u = vec![f64::NAN];
        assert_eq!(ode.solve(1., &mut u), CVStatus::Ok);
        assert_eq_tol!(u[0], 1., 1e-12);
    }

    #[test]
    fn cvode_nonmonotonic_time() {
        let ctx = Context::new().unwrap();
        let mut ode = CVode::adams(ctx, 0., &[1.],
            |_, _, du: &mut [f64; 1]| *du = [1.]).unwrap();
        let mut u = [f64::NAN];
        ode.solve(1., &mut u);
        assert_eq!(ode.solve(0., &mut u), CVStatus::IllInput);
    }

    #[test]
    fn bdf_dense_jacobian() {
        let ctx = Context::new().unwrap();
        let mut ode = CVode::bdf(ctx, 0., &[2., 1.], rhs).unwrap()
            .tolerances(1e-9, 1e-9).unwrap()
            .jacobian(|_, _, _, j| problem::jacobian(j)).unwrap();
        let (u, st) = ode.solution(1.);
        assert_eq!(st, CVStatus::Ok);
        let e = problem::exact(1.);
        assert_eq_tol!(u[0], e[0], 1e-6);
        assert_eq_tol!(u[1], e[1], 1e-6);
        let stats = ode.stats().unwrap();
        assert!(stats.jac_evals > 0);
        assert_eq!(stats.jtimes_evals, 0);
    }

    #[test]
    fn bdf_spgmr_jac_times() {
        let ctx = Context::new().unwrap();
        let mut ode = CVode::bdf(ctx, 0., &[2., 1.], rhs).unwrap()
            .tolerances(1e-9, 1e-9).unwrap()
            .spgmr(0).unwrap()
            .jac_times(|_, _, v: &[f64; 2], jv: &mut [f64; 2]| {
                problem::jac_times(v, jv)
            }).unwrap();
        let (u, st) = ode.solution(2.);
        assert_eq!(st, CVStatus::Ok);
        let e = problem::exact(2.);
        assert_eq_tol!(u[0], e[0], 1e-6);
        assert_eq_tol!(u[1], e[1], 1e-6);
        let stats = ode.stats().unwrap();
        assert!(stats.jtimes_evals > 0);
        assert_eq!(stats.jac_evals, 0);
    }

    #[test]
    fn jacobian_needs_dense_solver() {
        let ctx = Context::new().unwrap();
        let ode = CVode::bdf(ctx, 0., &[2., 1.], rhs).unwrap()
            .spgmr(0).unwrap();
        assert!(matches!(ode.jacobian(|_, _, _, j| problem::jacobian(j)),
                         Err(Error::Failure { .. })));
        let ctx = Context::new().unwrap();
        let ode = CVode::bdf(ctx, 0., &[2., 1.], rhs).unwrap();
        let r = ode.jac_times(|_, _, v: &[f64; 2], jv: &mut [f64; 2]| {
            problem::jac_times(v, jv) });
        assert!(matches!(r, Err(Error::Failure { .. })));
    }

    #[test]
    fn negative_tolerance() {
        let ctx = Context::new().unwrap();
        let ode = CVode::bdf(ctx, 0., &[2., 1.], rhs).unwrap();
        assert!(matches!(ode.tolerances(-1., 1e-5),
                         Err(Error::Flag { name: "CVodeSStolerances", .. })));
    }

    #[test]
    fn maxord_out_of_range() {
        let ctx = Context::new().unwrap();
        let ode = CVode::bdf(ctx, 0., &[2., 1.], rhs).unwrap();
        assert!(matches!(ode.maxord(6),
                         Err(Error::Flag { name: "CVodeSetMaxOrd", .. })));
        let ctx = Context::new().unwrap();
        let mut ode = CVode::bdf(ctx, 0., &[2., 1.], rhs).unwrap()
            .maxord(2).unwrap()
            .max_hnil_warns(1).unwrap();
        let (u, st) = ode.solution(1.);
        st.check("CVode").unwrap();
        assert_eq_tol!(u[1], problem::exact(1.)[1], 1e-4);
    }

    #[test]
    fn flag_names() {
        assert_eq!(super::return_flag_name(CV_ILL_INPUT).as_deref(),
                   Some("CV_ILL_INPUT"));
        assert_eq!(super::return_flag_name(CV_TOO_MUCH_WORK).as_deref(),
                   Some("CV_TOO_MUCH_WORK"));
    }

    #[test]
    fn switch_back_to_dense() {
        let ctx = Context::new().unwrap();
        let mut ode = CVode::bdf(ctx, 0., &[2., 1.], rhs).unwrap()
            .spgmr(10).unwrap()
            .dense().unwrap();
        let (u, st) = ode.solution(1.);
        st.check("CVode").unwrap();
        assert_eq_tol!(u[1], problem::exact(1.)[1], 1e-4);
    }

    #[test]
    fn cvode_with_param() {
        let ctx = Context::new().unwrap();
        let c = 1.;
        let mut ode = CVode::adams(ctx, 0., &[0.],
            |_, _, du: &mut [f64; 1]| *du = [c]).unwrap();
        let mut u1 = [f64::NAN];
        ode.solve(1., &mut u1);
        assert_eq_tol!(u1[0], c, 1e-5);
    }

    #[test]
    fn cvode_with_root() {
        let ctx = Context::new().unwrap();
        let mut u = [f64::NAN; 2];
        let r = CVode::adams(ctx, 0., &[0., 1.],
            |_, u: &[f64; 2], du: &mut [f64; 2]| *du = [u[1], -2.]).unwrap()
            .root(|_, u: &[f64; 2], r: &mut [f64; 2]| {
                *r = [u[0], u[0] - 100.] }).unwrap()
            .solve(2., &mut u); // Time is past the root
        match r {
            CVStatus::Root(t, roots) => {
                assert_eq!(roots, vec![true, false]);
                assert_eq_tol!(t, 1., 1e-12);
                assert_eq_tol!(u[0], 0., 1e-12);
                assert_eq_tol!(u[1], -1., 1e-12);
            }
            _ => panic!("`Root` expected")
        }
    }

    #[test]
    fn compatible_with_eyre() -> eyre::Result<()> {
        let ctx = Context::new()?;
        let _ = CVode::adams(ctx, 0., &[1.],
            |t, y: &[f64; 1], dy: &mut [f64; 1]| *dy = [t * y[0]])?;
        Ok(())
    }
}
