//! Stiff linear system solved by two MPI processes, each one
//! evaluating a single component of the right-hand side.
//!
//! Run with `mpirun -n 2 target/debug/examples/simple_parallel`.

use std::error::Error;
use log::info;
use mpi::traits::*;
use sundials_tutorials::{
    Context, cvode::CVode, parallel::Split, problem::Settings};

mod common;

fn main() -> Result<(), Box<dyn Error>> {
    common::init_logger();
    let universe = mpi::initialize().ok_or("MPI is already initialized")?;
    let world = universe.world();
    let name = mpi::environment::processor_name()?;
    println!("Hello world from processor {}, rank {} out of {} processors",
             name, world.rank(), world.size());

    let split = Split::new(&world)?;
    let s = Settings::default();
    if split.is_root() {
        info!("Solving the test system on 2 processes: {:?}", s);
    }
    let ctx = Context::new()?;
    let mut ode = CVode::bdf(ctx, s.t0, &s.y0,
        |_, u: &[f64; 2], du: &mut [f64; 2]| split.rhs(u, du))?
        .tolerances(s.rtol, s.atol)?
        .spgmr(s.maxl)?
        .jac_times(|_, _, v: &[f64; 2], jv: &mut [f64; 2]| {
            split.jac_times(v, jv)
        })?;
    let mut y = s.y0;
    for tout in s.output_times() {
        ode.solve(tout, &mut y).check("CVode")?;
        if split.is_root() {
            common::print_output(ode.time(), &y);
        }
    }
    if split.is_root() {
        println!("{}", ode.stats()?);
    }
    Ok(())
}
