/// Progress update emitted while a dataset build materializes files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildProgress {
    /// Human-readable stage name.
    pub stage: &'static str,
    /// Number of images processed so far.
    pub processed: usize,
    /// Total images discovered.
    pub total: usize,
}

pub(super) fn progress_tick(
    progress: &mut Option<&mut dyn FnMut(BuildProgress)>,
    stage: &'static str,
    processed: usize,
    total: usize,
) {
    if let Some(callback) = progress.as_deref_mut() {
        callback(BuildProgress {
            stage,
            processed,
            total,
        });
    }
}
