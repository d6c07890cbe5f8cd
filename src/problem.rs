//! The stiff linear test system of the tutorials
//!
//!   u₀' = -101 u₀ - 100 u₁,
//!   u₁' = u₀,
//!
//! whose matrix has eigenvalues -1 and -100, together with the
//! parameters of the runs.

use crate::matrix::DenseMut;

/// Matrix of the linear system.
pub const A: [[f64; 2]; 2] = [[-101., -100.],
                              [1., 0.]];

/// Right-hand side of the system: `du` = A `u`.
#[inline]
pub fn rhs(u: &[f64; 2], du: &mut [f64; 2]) {
    *du = [component(0, u), component(1, u)];
}

/// Component `i` of the right-hand side.  In the MPI tutorial,
/// process `i` evaluates this component only.
#[inline]
pub fn component(i: usize, u: &[f64; 2]) -> f64 {
    A[i][0] * u[0] + A[i][1] * u[1]
}

/// Component `i` of the Jacobian-times-vector product A `v`.
#[inline]
pub fn jac_times_component(i: usize, v: &[f64; 2]) -> f64 {
    component(i, v)
}

/// Jacobian of the system, i.e., the matrix A.
pub fn jacobian(j: &mut DenseMut<'_>) {
    for (r, row) in A.iter().enumerate() {
        for (c, &a) in row.iter().enumerate() {
            j[(r, c)] = a;
        }
    }
}

/// Jacobian-times-vector product: `jv` = A `v`.
#[inline]
pub fn jac_times(v: &[f64; 2], jv: &mut [f64; 2]) {
    // The system is linear.
    rhs(v, jv)
}

/// Right-hand side of the backward problem integrated in the adjoint
/// tutorial: yBᵢ' = -(y₀' + y₁') yBᵢ.
pub fn adjoint_rhs(y: &[f64; 2], yb: &[f64; 2], ybdot: &mut [f64; 2]) {
    let s = component(0, y) + component(1, y);
    *ybdot = [-s * yb[0], -s * yb[1]];
}

/// Exact solution of the system with initial value (2, 1) at t = 0.
pub fn exact(t: f64) -> [f64; 2] {
    let slow = (-t).exp() / 33.;
    let fast = (-100. * t).exp() / 33.;
    [-34. * slow + 100. * fast,
     34. * slow - fast]
}

/// Exact solution at time `t` of the backward problem with value `yb_tf`
/// at time `tf`.  With s = y₀ + y₁, one has yB(t) = yB(tf) e^{s(tf) - s(t)}.
pub fn adjoint_exact(t: f64, tf: f64, yb_tf: &[f64; 2]) -> [f64; 2] {
    let s = |t| { let y = exact(t); y[0] + y[1] };
    let c = (s(tf) - s(t)).exp();
    [c * yb_tf[0], c * yb_tf[1]]
}

/// Parameters of a tutorial run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Relative tolerance.
    pub rtol: f64,
    /// Absolute tolerance.
    pub atol: f64,
    /// Initial time.
    pub t0: f64,
    /// Initial value.
    pub y0: [f64; 2],
    /// Final time.
    pub t_end: f64,
    /// Time between two outputs.
    pub step: f64,
    /// First output time.
    pub first_output: f64,
    /// Maximum Krylov subspace dimension of SPGMR (0: Sundials default).
    pub maxl: usize,
    /// Number of integration steps between two checkpoints of the
    /// adjoint method.
    pub checkpoint_steps: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            rtol: 1e-5,
            atol: 1e-5,
            t0: 0.,
            y0: [2., 1.],
            t_end: 50.,
            step: 0.5,
            first_output: 0.5,
            maxl: 0,
            checkpoint_steps: 1000,
        }
    }
}

impl Settings {
    /// Output times `first_output`, `first_output + step`,... up to
    /// `t_end` (included).  They are computed by multiplication so no
    /// rounding error accumulates.  There are none if `step` is not
    /// positive.
    pub fn output_times(&self) -> impl Iterator<Item = f64> + use<> {
        let Settings { first_output, step, t_end, .. } = *self;
        let n = if step > 0. && first_output <= t_end {
            // Tolerate the rounding of the division.  An infinite range
            // saturates, giving an endless sequence.
            (((t_end - first_output) / step + 1e-9).floor() as usize)
                .saturating_add(1)
        } else {
            0
        };
        (0 .. n).map(move |k| first_output + k as f64 * step)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rhs_is_linear_map() {
        let mut du = [f64::NAN; 2];
        rhs(&[2., 1.], &mut du);
        assert_eq!(du, [-302., 2.]);
        let mut jv = [f64::NAN; 2];
        jac_times(&[0., 1.], &mut jv);
        assert_eq!(jv, [-100., 0.]);
        assert_eq!(jac_times_component(0, &[0., 1.]), jv[0]);
        assert_eq!(jac_times_component(1, &[0., 1.]), jv[1]);
    }

    #[test]
    fn dense_jacobian() {
        let mut buf = [f64::NAN; 4];
        jacobian(&mut DenseMut::from_column_major(&mut buf, 2, 2));
        // Column major.
        assert_eq!(buf, [-101., 1., -100., 0.]);
    }

    #[test]
    fn exact_solution() {
        assert_eq_tol!(exact(0.)[0], 2., 1e-14);
        assert_eq_tol!(exact(0.)[1], 1., 1e-14);
        // Check the equation by central differences.
        let (t, h) = (0.03, 1e-6);
        let (yp, ym) = (exact(t + h), exact(t - h));
        let mut du = [0.; 2];
        rhs(&exact(t), &mut du);
        for i in 0 .. 2 {
            assert_eq_tol!((yp[i] - ym[i]) / (2. * h), du[i], 1e-5);
        }
    }

    #[test]
    fn adjoint_exact_solution() {
        let (t, h, tf) = (0.02, 1e-6, 50.);
        let yb = |t| adjoint_exact(t, tf, &[2., 1.]);
        let mut ybdot = [0.; 2];
        adjoint_rhs(&exact(t), &yb(t), &mut ybdot);
        for i in 0 .. 2 {
            assert_eq_tol!((yb(t + h)[i] - yb(t - h)[i]) / (2. * h),
                           ybdot[i], 1e-5);
        }
        assert_eq_tol!(yb(tf)[0], 2., 1e-14);
        assert_eq_tol!(yb(0.)[1], (-3f64).exp(), 1e-12);
    }

    #[test]
    fn default_output_times() {
        let s = Settings::default();
        let t: Vec<_> = s.output_times().collect();
        assert_eq!(t.len(), 100);
        assert_eq!(t[0], 0.5);
        assert_eq!(*t.last().unwrap(), 50.);
    }

    #[test]
    fn output_times_from_20() {
        let s = Settings { first_output: 20., ..Settings::default() };
        let t: Vec<_> = s.output_times().collect();
        assert_eq!(t.len(), 61);
        assert_eq!(t[1], 20.5);
        let s = Settings { first_output: 60., ..Settings::default() };
        assert_eq!(s.output_times().count(), 0);
    }

    #[test]
    fn output_times_partial_last_step() {
        let s = Settings { first_output: 0.5, step: 0.5, t_end: 1.2,
                           ..Settings::default() };
        assert_eq!(s.output_times().collect::<Vec<_>>(), vec![0.5, 1.]);
        let s = Settings { first_output: 0.1, step: 0.1, t_end: 0.3,
                           ..Settings::default() };
        let t: Vec<_> = s.output_times().collect();
        assert_eq!(t.len(), 3);
        assert_eq_tol!(t[2], 0.3, 1e-15);
    }

    #[test]
    fn output_times_without_positive_step() {
        for step in [0., -0.5, f64::NAN] {
            let s = Settings { step, ..Settings::default() };
            assert_eq!(s.output_times().count(), 0);
        }
    }

    #[test]
    fn output_times_unbounded() {
        let s = Settings { t_end: f64::INFINITY, ..Settings::default() };
        let t: Vec<_> = s.output_times().take(3).collect();
        assert_eq!(t, vec![0.5, 1., 1.5]);
    }
}
