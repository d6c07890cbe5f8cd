//! Adjoint method: the test system is integrated forward with
//! checkpointing, then the backward problem yB' = -(u₀' + u₁') yB is
//! integrated from the final time back to the initial time.
//!
//! Build with `--no-default-features --features cvodes`.

use std::error::Error;
use log::info;
use sundials_tutorials::{
    Context,
    cvodes::{CVodes, Interpolation, Lmm},
    problem::{self, Settings},
};

mod common;

fn main() -> Result<(), Box<dyn Error>> {
    common::init_logger();
    let s = Settings::default();
    info!("Adjoint of the test system: {:?}", s);
    let ctx = Context::new()?;
    let mut ode = CVodes::bdf(ctx, s.t0, &s.y0,
        |_, u: &[f64; 2], du: &mut [f64; 2]| problem::rhs(u, du))?
        .tolerances(s.rtol, s.atol)?
        .spgmr(s.maxl)?
        .adj_init(s.checkpoint_steps, Interpolation::Hermite)?;

    println!("Performing Forward Integration:\n");
    let mut y = s.y0;
    for tout in s.output_times() {
        ode.solve_forward(tout, &mut y).check("CVodeF")?;
        common::print_output(ode.time(), &y);
    }
    info!("{} checkpoints stored", ode.checkpoints());
    println!("{}", ode.stats()?);

    println!("Performing Backward Integration:\n");
    let yb_end = s.y0;
    let mut ode = ode.backward(Lmm::Bdf, s.t_end, &yb_end,
        |_, y: &[f64; 2], yb: &[f64; 2], ybdot: &mut [f64; 2]| {
            problem::adjoint_rhs(y, yb, ybdot)
        })?;
    ode.solve_backward(s.t0).check("CVodeB")?;
    let mut yb = [f64::NAN; 2];
    let t = ode.backward_solution(&mut yb)?;
    common::print_output(t, &yb);
    let e = problem::adjoint_exact(t, s.t_end, &yb_end);
    info!("Exact backward solution: [{:e}, {:e}]", e[0], e[1]);
    println!("{}", ode.stats_b()?);
    Ok(())
}
