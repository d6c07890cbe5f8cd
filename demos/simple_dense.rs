//! Stiff linear system solved with the BDF method, the dense direct
//! linear solver and a user supplied Jacobian.

use std::error::Error;
use log::info;
use sundials_tutorials::{Context, cvode::CVode, problem::{self, Settings}};

mod common;

fn main() -> Result<(), Box<dyn Error>> {
    common::init_logger();
    let s = Settings::default();
    info!("Solving the test system with BDF and a dense Jacobian: {:?}", s);
    let ctx = Context::new()?;
    let mut ode = CVode::bdf(ctx, s.t0, &s.y0,
        |_, u: &[f64; 2], du: &mut [f64; 2]| problem::rhs(u, du))?
        .tolerances(s.rtol, s.atol)?
        .jacobian(|_, _, _, j| problem::jacobian(j))?;
    let mut y = s.y0;
    for tout in s.output_times() {
        ode.solve(tout, &mut y).check("CVode")?;
        common::print_output(ode.time(), &y);
    }
    println!("{}", ode.stats()?);
    Ok(())
}
