//! Evaluation of the tutorial system split over two MPI processes.
//!
//! Each process holds the whole (replicated) state and its own solver
//! but only evaluates the component of the right-hand side (or of the
//! Jacobian-times-vector product) of index its rank.  The components
//! are then exchanged with a barrier followed by an all-gather so all
//! processes integrate the same system.

use log::{debug, error};
use mpi::traits::*;
use crate::{Error, problem};

/// Split of the tutorial system over the processes of `comm`.
pub struct Split<'a, C: Communicator> {
    comm: &'a C,
    rank: usize,
}

impl<'a, C: Communicator> Split<'a, C> {
    /// Return the split over `comm` which must contain exactly one
    /// process per component of the system.
    pub fn new(comm: &'a C) -> Result<Self, Error> {
        let size = comm.size();
        if size != 2 {
            error!("The communicator has {} processes but exactly 2 are \
                    required", size);
            return Err(Error::Communicator { size })
        }
        let rank = comm.rank() as usize;
        debug!("Process {} evaluates component {}", rank, rank);
        Ok(Split { comm, rank })
    }

    pub fn rank(&self) -> usize { self.rank }

    /// Whether this process is the one printing the results.
    pub fn is_root(&self) -> bool { self.rank == 0 }

    fn gather(&self, local: f64, out: &mut [f64; 2]) {
        self.comm.barrier();
        self.comm.all_gather_into(&local, &mut out[..]);
    }

    /// `du` = A `u`, this process computing the component of index its
    /// rank.
    pub fn rhs(&self, u: &[f64; 2], du: &mut [f64; 2]) {
        self.gather(problem::component(self.rank, u), du)
    }

    /// `jv` = A `v`, distributed as [`Split::rhs`].
    pub fn jac_times(&self, v: &[f64; 2], jv: &mut [f64; 2]) {
        self.gather(problem::jac_times_component(self.rank, v), jv)
    }
}
