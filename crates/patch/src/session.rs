//! Running state of one combined download

use apx_events::SpeedSampler;
use apx_types::{DownloadInfo, FileProgress, SpeedProgress};

/// Turns one downloader's absolute counters into deltas
///
/// Reset each time a new downloader is subscribed. A report lower than the
/// highest one seen so far contributes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ProgressAdapter {
    last_count: u64,
    last_bytes: u64,
}

impl ProgressAdapter {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Returns `(count_delta, bytes_delta)` since the previous report
    pub fn delta(&mut self, progress: FileProgress) -> (u64, u64) {
        let count = progress.current_count.saturating_sub(self.last_count);
        let bytes = progress.current_bytes.saturating_sub(self.last_bytes);
        self.last_count = self.last_count.max(progress.current_count);
        self.last_bytes = self.last_bytes.max(progress.current_bytes);
        (count, bytes)
    }
}

/// Frozen totals plus running counters for a single orchestration call
#[derive(Debug)]
pub(crate) struct SessionState {
    totals: DownloadInfo,
    current_count: u64,
    current_bytes: u64,
    adapter: ProgressAdapter,
    sampler: SpeedSampler,
}

impl SessionState {
    pub fn new(totals: DownloadInfo, sampler: SpeedSampler) -> Self {
        Self {
            totals,
            current_count: 0,
            current_bytes: 0,
            adapter: ProgressAdapter::default(),
            sampler,
        }
    }

    /// Prepare for the next downloader's counters
    pub fn subscribe(&mut self) {
        self.adapter.reset();
    }

    /// Fold one downloader report into the session and sample the speed
    pub fn observe(&mut self, progress: FileProgress) -> SpeedProgress {
        let (count, bytes) = self.adapter.delta(progress);
        self.current_count = self.current_count.saturating_add(count);
        self.current_bytes = self.current_bytes.saturating_add(bytes);

        let snapshot = FileProgress {
            total_count: self.totals.total_count,
            current_count: self.current_count,
            total_bytes: self.totals.total_bytes,
            current_bytes: self.current_bytes,
        };
        self.sampler.record(bytes, snapshot)
    }

    pub fn current(&self) -> (u64, u64) {
        (self.current_count, self.current_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apx_events::SpeedConfig;

    fn report(current_count: u64, current_bytes: u64) -> FileProgress {
        FileProgress {
            total_count: 3,
            current_count,
            total_bytes: 300,
            current_bytes,
        }
    }

    #[test]
    fn adapter_produces_deltas() {
        let mut adapter = ProgressAdapter::default();
        assert_eq!(adapter.delta(report(1, 100)), (1, 100));
        assert_eq!(adapter.delta(report(3, 300)), (2, 200));
    }

    #[test]
    fn regressing_report_adds_nothing() {
        let mut adapter = ProgressAdapter::default();
        adapter.delta(report(2, 200));
        assert_eq!(adapter.delta(report(1, 100)), (0, 0));
        assert_eq!(adapter.delta(report(3, 300)), (1, 100));
    }

    #[test]
    fn session_accumulates_across_downloaders() {
        let totals = DownloadInfo {
            total_count: 5,
            total_bytes: 500,
        };
        let mut session = SessionState::new(totals, SpeedSampler::new(SpeedConfig::default()));

        session.subscribe();
        session.observe(report(3, 300));
        session.subscribe();
        let update = session.observe(report(1, 100));

        assert_eq!(update.current_count, 4);
        assert_eq!(update.current_bytes, 400);
        assert_eq!(update.total_count, 5);
        assert_eq!(update.total_bytes, 500);
        assert_eq!(session.current(), (4, 400));
    }
}
