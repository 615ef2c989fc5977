use core::fmt::Display;
use std::time::{Duration, Instant};

/// One timed region of a core's execution, relative to the start of the launch.
#[derive(new, Clone, Debug, PartialEq, Eq)]
pub struct Span {
    /// Name of the region.
    pub label: &'static str,
    /// Offset of the region start.
    pub start: Duration,
    /// Offset of the region end.
    pub end: Duration,
}

impl Span {
    /// Time spent in the region.
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}

/// Records the spans of one core, standing in for cycle-counter markers around pipeline
/// stages.
#[derive(Debug)]
pub struct StageTimer {
    origin: Instant,
    enabled: bool,
    spans: Vec<Span>,
}

impl StageTimer {
    /// Timer measuring from `origin`. A disabled timer records nothing.
    pub fn new(origin: Instant, enabled: bool) -> Self {
        Self {
            origin,
            enabled,
            spans: Vec::new(),
        }
    }

    /// Whether spans are recorded.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Records a region that started at `start` and ends now.
    pub fn record(&mut self, label: &'static str, start: Instant) {
        if self.enabled {
            let end = Instant::now();
            self.spans.push(Span::new(
                label,
                start.duration_since(self.origin),
                end.duration_since(self.origin),
            ));
        }
    }

    /// Every recorded span, in completion order.
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Total time per label, in order of first appearance.
    pub fn totals(&self) -> Vec<(&'static str, Duration)> {
        let mut totals: Vec<(&'static str, Duration)> = Vec::new();
        for span in self.spans.iter() {
            match totals.iter_mut().find(|(label, _)| *label == span.label) {
                Some((_, total)) => *total += span.duration(),
                None => totals.push((span.label, span.duration())),
            }
        }
        totals
    }
}

/// Summary of one core's stage timer.
#[derive(Debug)]
pub struct StageReport<'a> {
    pub(crate) cluster_idx: usize,
    pub(crate) core_idx: usize,
    pub(crate) timer: &'a StageTimer,
}

impl Display for StageReport<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[cluster {} core {}]", self.cluster_idx, self.core_idx)?;
        for (label, total) in self.timer.totals() {
            write!(f, " {label}={total:?}")?;
        }
        Ok(())
    }
}
