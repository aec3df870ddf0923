/// Progress sink for a long-running package build.
pub trait Job: Send + Sync {
    /// Start a new named sub-task; progress restarts from zero.
    fn sub(&self, name: &str);

    /// Fraction of the current sub-task done, in `[0, 1]`.
    fn set_progress(&self, progress: f32);
}
