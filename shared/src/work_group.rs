use crate::error::ReplicationError;

/// One unit of serialize or deserialize work.
pub type Job = Box<dyn FnOnce() -> Result<(), ReplicationError> + Send>;

/// Collects the units of work of one tick and runs them behind a single
/// blocking join.
#[derive(Default)]
pub struct WorkGroup {
    jobs: Vec<Job>,
}

impl WorkGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F>(&mut self, job: F)
    where
        F: FnOnce() -> Result<(), ReplicationError> + Send + 'static,
    {
        self.jobs.push(Box::new(job));
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Runs every queued job and waits for all of them. Returns the error of
    /// the first failing job in push order.
    pub fn join(&mut self) -> Result<(), ReplicationError> {
        let jobs = std::mem::take(&mut self.jobs);
        if jobs.is_empty() {
            return Ok(());
        }

        let results = run_jobs(jobs);
        results.into_iter().collect::<Result<Vec<()>, _>>()?;
        Ok(())
    }
}

cfg_if! {
    if #[cfg(feature = "parallel")] {
        fn run_jobs(jobs: Vec<Job>) -> Vec<Result<(), ReplicationError>> {
            use rayon::prelude::*;

            jobs.into_par_iter().map(|job| job()).collect()
        }
    } else {
        fn run_jobs(jobs: Vec<Job>) -> Vec<Result<(), ReplicationError>> {
            jobs.into_iter().map(|job| job()).collect()
        }
    }
}
