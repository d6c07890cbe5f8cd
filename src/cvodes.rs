//! `CVodes` is a solver for stiff and nonstiff ODE systems with
//! sensitivity analysis capabilities.  Only the adjoint method with a
//! single backward problem is provided.
//!
//! The forward problem ẏ = f(t,y) is first integrated from `t0` to
//! `T` with checkpointing ([`CVodes::adj_init`] and
//! [`CVodes::solve_forward`]).  The backward problem ẏB = fB(t,y,yB),
//! with a final value at `T`, is then integrated towards `t0`
//! ([`CVodes::backward`] and [`CVodes::solve_backward`]), the forward
//! solution being recomputed from the checkpoints.

use std::{
    ffi::{c_int, c_long, c_void},
    marker::PhantomData,
    pin::Pin,
    ptr,
};
use log::debug;
use sundials_sys::*;
use crate::{
    Context,
    Error,
    check_flag,
    cvode::{self, CVodeMem, CVStatus, Linear, Stats, callback},
    vector::Vector,
};

/// Linear multistep method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lmm {
    Adams,
    Bdf,
}

impl Lmm {
    fn to_c(self) -> c_int {
        match self {
            Lmm::Adams => CV_ADAMS as _,
            Lmm::Bdf => CV_BDF as _,
        }
    }
}

/// Interpolation of the forward solution between checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Cubic Hermite interpolation.
    Hermite,
    /// Variable-degree polynomial interpolation.
    Polynomial,
}

/// Solver for a forward problem of type `F` and (after
/// [`CVodes::backward`]) a backward problem of type `B`.
pub struct CVodes<V, F, B = ()>
where V: Vector {
    cvode_mem: CVodeMem,
    // Only held to be freed after `cvode_mem`.
    #[allow(dead_code)]
    linear: Linear,
    // Solver of the backward problem (if any).
    #[allow(dead_code)]
    linear_b: Option<Linear>,
    which: Option<c_int>,
    user_data: Pin<Box<UserData<F, B>>>,
    t0: f64,
    tret: f64,
    n: usize,
    vec: PhantomData<V>,
    rtol: f64,
    atol: f64,
    ncheck: c_int,
    ctx: Context, // Dropped last
}

// `f` must stay first so the forward callback does not depend on `B`.
#[repr(C)]
struct UserData<F, B> {
    f: F,
    fb: B,
}

impl<V, F, B> CVodes<V, F, B>
where V: Vector {
    #[allow(clippy::too_many_arguments)]
    fn new_with_fn<B1>(
        ctx: Context, cvode_mem: CVodeMem,
        linear: Linear, linear_b: Option<Linear>, which: Option<c_int>,
        t0: f64, tret: f64, n: usize, rtol: f64, atol: f64, ncheck: c_int,
        f: F, fb: B1,
    ) -> Result<CVodes<V, F, B1>, Error> {
        let user_data = Box::pin(UserData { f, fb });
        let user_data_ptr =
            user_data.as_ref().get_ref() as *const _ as *mut c_void;
        let ode = CVodes {
            cvode_mem, linear, linear_b, which, user_data,
            t0, tret, n, vec: PhantomData,
            rtol, atol, ncheck,
            ctx,
        };
        check_flag("CVodeSetUserData", unsafe {
            CVodeSetUserData(ode.cvode_mem.0, user_data_ptr) })?;
        if let Some(which) = which {
            check_flag("CVodeSetUserDataB", unsafe {
                CVodeSetUserDataB(ode.cvode_mem.0, which, user_data_ptr) })?;
        }
        Ok(ode)
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }
}

impl<V, F> CVodes<V, F>
where V: Vector,
      F: FnMut(f64, V::View<'_>, V::ViewMut<'_>)
{
    extern "C" fn cvrhs(t: f64, nvy: N_Vector, nvdy: N_Vector,
                        user_data: *mut c_void
    ) -> c_int {
        callback("right-hand side function", || {
            let y = V::from_nvector(nvy);
            let dy = V::from_nvector_mut(nvdy);
            let u = unsafe { &mut *(user_data as *mut UserData<F, ()>) };
            (u.f)(t, y, dy);
        })
    }

    fn init(
        name: &'static str, lmm: Lmm, ctx: Context, t0: f64, y0: &V, f: F,
    ) -> Result<Self, Error> {
        let rtol = 1e-6;
        let atol = 1e-12;
        let (cvode_mem, linear) = cvode::create(
            name, lmm.to_c(), &ctx, t0, y0, Some(Self::cvrhs), rtol, atol)?;
        let n = y0.len();
        debug!("{}: initialized with {} equations at t0 = {}", name, n, t0);
        Self::new_with_fn(
            ctx, cvode_mem, linear, None, None,
            t0, t0, n, rtol, atol, 0, f, ())
    }

    /// Solver using the Adams linear multistep method.
    pub fn adams(ctx: Context, t0: f64, y0: &V, f: F) -> Result<Self, Error> {
        Self::init("CVodes::adams", Lmm::Adams, ctx, t0, y0, f)
    }

    /// Solver using the BDF linear multistep method.
    pub fn bdf(ctx: Context, t0: f64, y0: &V, f: F) -> Result<Self, Error> {
        Self::init("CVodes::bdf", Lmm::Bdf, ctx, t0, y0, f)
    }

    /// Use the SPGMR iterative solver (without preconditioning) for
    /// the forward problem.  See [`crate::cvode::CVode::spgmr`].
    pub fn spgmr(mut self, maxl: usize) -> Result<Self, Error> {
        let linear = Linear::spgmr("CVodes::spgmr", &self.ctx, self.n, maxl)?;
        check_flag("CVodeSetLinearSolver", unsafe {
            CVodeSetLinearSolver(self.cvode_mem.0, linear.solver.as_ptr(),
                                 ptr::null_mut()) })?;
        self.linear = linear;
        Ok(self)
    }

    /// Allocate the memory for the adjoint method: a checkpoint is
    /// stored every `nsteps` integration steps of the forward problem.
    /// Must be called before [`CVodes::solve_forward`].
    pub fn adj_init(self, nsteps: usize, interp: Interpolation)
                    -> Result<Self, Error> {
        let nsteps =
            if nsteps <= c_long::MAX as usize { nsteps as _ } else { c_long::MAX };
        let interp = match interp {
            Interpolation::Hermite => CV_HERMITE,
            Interpolation::Polynomial => CV_POLYNOMIAL,
        };
        check_flag("CVodeAdjInit", unsafe {
            CVodeAdjInit(self.cvode_mem.0, nsteps, interp as _) })?;
        debug!("CVodes: adjoint memory with a checkpoint every {} steps",
               nsteps);
        Ok(self)
    }
}

/// # Forward problem
impl<V, F, B> CVodes<V, F, B>
where V: Vector {
    /// Set the scalar relative and absolute tolerances of the forward
    /// problem.  A backward problem created afterwards inherits them.
    pub fn tolerances(mut self, rtol: f64, atol: f64) -> Result<Self, Error> {
        check_flag("CVodeSStolerances", unsafe {
            CVodeSStolerances(self.cvode_mem.0, rtol, atol) })?;
        self.rtol = rtol;
        self.atol = atol;
        Ok(self)
    }

    /// Integrate the forward problem up to `t`, storing checkpoints,
    /// and set `y` to the solution.
    pub fn solve_forward(&mut self, t: f64, y: &mut V) -> CVStatus {
        let yout = match unsafe { y.to_nvector_mut(self.ctx.as_ptr()) } {
            Ok(yout) => yout,
            Err(_) => return CVStatus::Other(CV_MEM_FAIL),
        };
        let mut tret = self.tret;
        let mut ncheck: c_int = 0;
        let r = unsafe { CVodeF(
            self.cvode_mem.0, t, yout.as_ptr(), &mut tret,
            CV_NORMAL as _, &mut ncheck) };
        self.tret = tret;
        self.ncheck = ncheck;
        CVStatus::of_flag(r, tret, Vec::new)
    }

    /// Number of checkpoints stored so far.
    pub fn checkpoints(&self) -> usize {
        self.ncheck.max(0) as usize
    }

    /// Time reached by the forward integration.
    pub fn time(&self) -> f64 {
        self.tret
    }

    pub fn t0(&self) -> f64 {
        self.t0
    }

    /// Statistics of the forward problem.
    pub fn stats(&self) -> Result<Stats, Error> {
        Stats::of_mem(self.cvode_mem.0)
    }
}

/// # Backward problem
impl<V, F> CVodes<V, F>
where V: Vector,
      F: Unpin
{
    extern "C" fn cvrhsb<B1>(
        t: f64, y: N_Vector, yb: N_Vector, ybdot: N_Vector,
        user_data: *mut c_void,
    ) -> c_int
    where B1: FnMut(f64, V::View<'_>, V::View<'_>, V::ViewMut<'_>) {
        callback("backward right-hand side function", || {
            let u = unsafe { &mut *(user_data as *mut UserData<F, B1>) };
            (u.fb)(t, V::from_nvector(y), V::from_nvector(yb),
                   V::from_nvector_mut(ybdot));
        })
    }

    /// Create the backward problem ẏB = `fb`(t, y, yB) with value
    /// `yb0` at `tb0` (the final time of the forward integration),
    /// solved with the method `lmm` and the SPGMR linear solver.  Its
    /// tolerances are those of the forward problem, see
    /// [`CVodes::tolerances_b`].
    pub fn backward<B1>(self, lmm: Lmm, tb0: f64, yb0: &V, fb: B1)
                        -> Result<CVodes<V, F, B1>, Error>
    where B1: FnMut(f64, V::View<'_>, V::View<'_>, V::ViewMut<'_>)
              + Unpin {
        let mem = self.cvode_mem.0;
        let mut which: c_int = 0;
        check_flag("CVodeCreateB", unsafe {
            CVodeCreateB(mem, lmm.to_c(), &mut which) })?;
        let nvyb0 = unsafe { yb0.to_nvector(self.ctx.as_ptr())? };
        check_flag("CVodeInitB", unsafe {
            CVodeInitB(mem, which, Some(Self::cvrhsb::<B1>), tb0,
                       nvyb0.as_ptr()) })?;
        drop(nvyb0);
        check_flag("CVodeSStolerancesB", unsafe {
            CVodeSStolerancesB(mem, which, self.rtol, self.atol) })?;
        let linear_b = Linear::spgmr("CVodes::backward", &self.ctx,
                                     yb0.len(), 0)?;
        check_flag("CVodeSetLinearSolverB", unsafe {
            CVodeSetLinearSolverB(mem, which, linear_b.solver.as_ptr(),
                                  ptr::null_mut()) })?;
        debug!("CVodes: backward problem {} with final time {}", which, tb0);
        let u = *Pin::into_inner(self.user_data);
        Self::new_with_fn(
            self.ctx, self.cvode_mem, self.linear, Some(linear_b),
            Some(which), self.t0, self.tret, self.n, self.rtol, self.atol,
            self.ncheck, u.f, fb)
    }
}

impl<V, F, B> CVodes<V, F, B>
where V: Vector {
    fn which(&self, name: &'static str) -> Result<c_int, Error> {
        self.which.ok_or(Error::Failure {
            name, msg: "no backward problem was created" })
    }

    /// Set the scalar tolerances of the backward problem.
    pub fn tolerances_b(self, rtol: f64, atol: f64) -> Result<Self, Error> {
        let which = self.which("CVodes::tolerances_b")?;
        check_flag("CVodeSStolerancesB", unsafe {
            CVodeSStolerancesB(self.cvode_mem.0, which, rtol, atol) })?;
        Ok(self)
    }

    /// Integrate the backward problem towards `tb`.
    pub fn solve_backward(&mut self, tb: f64) -> CVStatus {
        let r = unsafe { CVodeB(self.cvode_mem.0, tb, CV_NORMAL as _) };
        CVStatus::of_flag(r, tb, Vec::new)
    }

    /// Set `yb` to the solution of the backward problem and return the
    /// time it corresponds to.
    pub fn backward_solution(&mut self, yb: &mut V) -> Result<f64, Error> {
        let which = self.which("CVodes::backward_solution")?;
        let mut t = f64::NAN;
        let nvyb = unsafe { yb.to_nvector_mut(self.ctx.as_ptr())? };
        check_flag("CVodeGetB", unsafe {
            CVodeGetB(self.cvode_mem.0, which, &mut t, nvyb.as_ptr()) })?;
        Ok(t)
    }

    /// Statistics of the backward problem.
    pub fn stats_b(&self) -> Result<Stats, Error> {
        let which = self.which("CVodes::stats_b")?;
        let mem = unsafe { CVodeGetAdjCVodeBmem(self.cvode_mem.0, which) };
        Stats::of_mem(crate::check_ptr("CVodeGetAdjCVodeBmem", mem)?)
    }
}
