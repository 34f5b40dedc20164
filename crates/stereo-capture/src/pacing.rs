use crate::Timestamp;

/// Inter-frame timing for one grab.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PacingReport {
    pub delta_ns: u64,
    /// Frames estimated lost between this grab and the previous one.
    pub dropped: u64,
}

/// Tracks consecutive frame timestamps against the nominal frame period.
#[derive(Clone, Debug)]
pub struct FramePacer {
    period_ns: u64,
    last: Option<Timestamp>,
    dropped_total: u64,
    frames: u64,
}

impl FramePacer {
    pub fn new(fps: u32) -> Self {
        Self {
            period_ns: 1_000_000_000 / u64::from(fps.max(1)),
            last: None,
            dropped_total: 0,
            frames: 0,
        }
    }

    pub fn period_ns(&self) -> u64 {
        self.period_ns
    }

    /// Record a timestamp. Returns `None` for the first frame.
    ///
    /// A gap above 1.5 periods counts `round(delta / period) - 1` dropped frames.
    pub fn observe(&mut self, ts: Timestamp) -> Option<PacingReport> {
        self.frames += 1;
        let prev = self.last.replace(ts)?;
        let delta_ns = ts.as_nanos().saturating_sub(prev.as_nanos());
        let dropped = if delta_ns.saturating_mul(2) > self.period_ns.saturating_mul(3) {
            (delta_ns.saturating_add(self.period_ns / 2) / self.period_ns).saturating_sub(1)
        } else {
            0
        };
        self.dropped_total = self.dropped_total.saturating_add(dropped);
        Some(PacingReport { delta_ns, dropped })
    }

    pub fn dropped_total(&self) -> u64 {
        self.dropped_total
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_frames_no_drops() {
        let mut p = FramePacer::new(30);
        assert_eq!(p.observe(Timestamp::from_nanos(0)), None);
        let r = p.observe(Timestamp::from_nanos(33_333_333)).unwrap();
        assert_eq!(r.dropped, 0);
        assert_eq!(r.delta_ns, 33_333_333);
    }

    #[test]
    fn test_gap_counts_drops() {
        let mut p = FramePacer::new(100);
        p.observe(Timestamp::from_nanos(0));
        let r = p.observe(Timestamp::from_nanos(30_000_000)).unwrap();
        assert_eq!(r.dropped, 2);
        let r = p.observe(Timestamp::from_nanos(44_000_000)).unwrap();
        assert_eq!(r.dropped, 0);
        assert_eq!(p.dropped_total(), 2);
        assert_eq!(p.frames(), 3);
    }

    #[test]
    fn test_huge_gap_saturates() {
        let mut p = FramePacer::new(15);
        p.observe(Timestamp::from_nanos(0));
        let r = p.observe(Timestamp::from_nanos(u64::MAX)).unwrap();
        assert_eq!(r.delta_ns, u64::MAX);
        assert_eq!(r.dropped, u64::MAX / p.period_ns() - 1);
        p.observe(Timestamp::from_nanos(u64::MAX));
        assert_eq!(p.dropped_total(), r.dropped);
    }
}
