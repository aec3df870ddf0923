use parking_lot::Mutex;
use rayon::prelude::*;

use crate::foundation::digest::{digest_file, digest_hex};
use crate::foundation::error::{DcpError, DcpResult};
use crate::package::job::Job;
use crate::reel::manifest::ReferencedReelAsset;
use crate::reel::writer::ReelWriter;

pub(crate) fn build_thread_pool(threads: Option<usize>) -> DcpResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(DcpError::validation(
            "digest_threads must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("dcp-digest-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| DcpError::contract(format!("failed to build rayon thread pool: {e}")))
}

/// Progress shared by digest workers; each reel reports its own fraction and the job sees the
/// slowest one.
///
/// Every reel starts at zero, so the aggregate only moves forward however rayon schedules them.
pub(crate) struct DigestProgress<'a> {
    job: Option<&'a dyn Job>,
    per_reel: Mutex<Vec<f32>>,
}

impl<'a> DigestProgress<'a> {
    pub(crate) fn new(job: Option<&'a dyn Job>, reels: usize) -> Self {
        Self {
            job,
            per_reel: Mutex::new(vec![0.0; reels]),
        }
    }

    pub(crate) fn report(&self, reel: usize, progress: f32) {
        if let Some(slot) = self.per_reel.lock().get_mut(reel) {
            *slot = slot.max(progress);
        }
        if let (Some(job), Some(overall)) = (self.job, self.overall()) {
            job.set_progress(overall);
        }
    }

    /// Aggregate currently visible to the job; `None` when there is nothing to digest.
    pub(crate) fn overall(&self) -> Option<f32> {
        self.per_reel.lock().iter().copied().reduce(f32::min)
    }
}

/// Digest every finished reel on `pool`.
#[tracing::instrument(skip_all, fields(reels = reels.len()))]
pub(crate) fn calculate_reel_digests(
    pool: &rayon::ThreadPool,
    reels: &[ReelWriter],
    progress: &DigestProgress<'_>,
) -> DcpResult<()> {
    pool.install(|| {
        reels
            .par_iter()
            .enumerate()
            .map(|(i, reel)| reel.calculate_digests(&|p| progress.report(i, p)))
            .collect::<DcpResult<Vec<()>>>()
    })?;
    Ok(())
}

/// Fill in the digest of referenced assets that arrived without one.
pub(crate) fn calculate_referenced_digests(
    pool: &rayon::ThreadPool,
    assets: &mut [ReferencedReelAsset],
) -> DcpResult<()> {
    pool.install(|| {
        assets
            .par_iter_mut()
            .filter(|r| r.asset.digest.is_none())
            .map(|r| -> DcpResult<()> {
                let digest = digest_file(&r.asset.path, |_| {})?;
                r.asset.digest = Some(digest_hex(&digest));
                Ok(())
            })
            .collect::<DcpResult<Vec<()>>>()
    })?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/writer/digest.rs"]
mod tests;
