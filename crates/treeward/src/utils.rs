//! Worker-pool plumbing shared by the training subsystem.
//!
//! The per-node feature scan is the only parallel region in this crate.
//! [`run_with_threads`] sizes a rayon pool once per training run; inside
//! the run a [`Parallelism`] flag rides along so code deep in the tree
//! recursion can fan work out (or not) without ever touching pool state
//! itself.

use rayon::prelude::*;

/// Execution mode for the feature scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Derive the mode from a worker count: `1` stays inline, anything
    /// larger fans out, and `0` means "all cores" (which still degenerates
    /// to inline execution when the ambient pool has a single thread).
    #[inline]
    pub fn from_threads(n_workers: usize) -> Self {
        match n_workers {
            1 => Parallelism::Sequential,
            0 if rayon::current_num_threads() == 1 => Parallelism::Sequential,
            _ => Parallelism::Parallel,
        }
    }

    #[inline]
    pub fn is_parallel(self) -> bool {
        self == Parallelism::Parallel
    }

    /// Map `f` over `items` and collect, fanning out across the installed
    /// pool in parallel mode. Output order follows input order in both
    /// modes; the split search's deterministic reduction depends on that.
    pub fn par_map<T, B, I, F>(self, items: I, f: F) -> Vec<B>
    where
        T: Send,
        B: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) -> B + Sync + Send,
    {
        match self {
            Parallelism::Sequential => items.into_iter().map(f).collect(),
            Parallelism::Parallel => items.into_par_iter().map(f).collect(),
        }
    }
}

/// Size a rayon pool to `n_workers` and run `f` inside it, handing the
/// matching [`Parallelism`] flag to the closure.
///
/// A worker count of one skips pool construction entirely; zero asks rayon
/// for every core.
pub fn run_with_threads<T: Send>(n_workers: usize, f: impl FnOnce(Parallelism) -> T + Send) -> T {
    let mode = Parallelism::from_threads(n_workers);
    if !mode.is_parallel() {
        return f(mode);
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_workers)
        .build()
        .expect("rayon pool construction failed")
        .install(|| f(mode))
}
