//! Swing points: the most recent confirmed local extremum of a series.
//!
//! Bar i-1 is a confirmed high when `x[i-1] >= x[i]` and `x[i-1] >= x[i-2]`
//! (`<=` for lows). The level becomes visible on bar i, the first bar that
//! can see both neighbours, and is carried forward until the next
//! confirmation. Unset inputs never confirm.

/// Which extremum a swing series tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Max,
    Min,
}

impl Extremum {
    fn confirms(self, left: f64, mid: f64, right: f64) -> bool {
        match self {
            Extremum::Max => mid >= right && mid >= left,
            Extremum::Min => mid <= right && mid <= left,
        }
    }
}

/// Forward-filled swing levels for `series`.
pub fn swing_points(series: &[Option<f64>], extremum: Extremum) -> Vec<Option<f64>> {
    let mut tracker = SwingTracker::new(extremum);
    series.iter().map(|&x| tracker.push(x)).collect()
}

/// Streaming form of [`swing_points`].
#[derive(Debug, Clone)]
pub struct SwingTracker {
    extremum: Extremum,
    window: [Option<f64>; 2],
    seen: usize,
    level: Option<f64>,
}

impl SwingTracker {
    pub fn new(extremum: Extremum) -> Self {
        Self {
            extremum,
            window: [None, None],
            seen: 0,
            level: None,
        }
    }

    pub fn push(&mut self, x: Option<f64>) -> Option<f64> {
        if self.seen >= 2 {
            if let (Some(left), Some(mid), Some(right)) = (self.window[0], self.window[1], x) {
                if self.extremum.confirms(left, mid, right) {
                    self.level = Some(mid);
                }
            }
        }
        self.window = [self.window[1], x];
        self.seen += 1;
        self.level
    }

    pub fn level(&self) -> Option<f64> {
        self.level
    }
}
