use std::time::Duration;

/// Alternating off/on timings, starting with an "off" lead-in. When `repeat` is
/// set, the pattern loops back to that index after the last timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VibrationPattern {
    timings: Vec<Duration>,
    repeat: Option<usize>,
}

impl VibrationPattern {
    pub fn new(timings: Vec<Duration>, repeat: Option<usize>) -> Self {
        let repeat = repeat.filter(|&i| i < timings.len());
        Self { timings, repeat }
    }

    /// Silent lead-in, then one second on, one second off, forever.
    pub fn ringing() -> Self {
        Self::new(
            vec![
                Duration::ZERO,
                Duration::from_millis(1000),
                Duration::from_millis(1000),
            ],
            Some(0),
        )
    }

    pub fn segments(&self) -> Segments {
        Segments {
            pattern: self.clone(),
            index: 0,
        }
    }

    /// True when no segment of the pattern vibrates for any length of time.
    pub fn is_degenerate(&self) -> bool {
        !self
            .segments()
            .take(self.timings.len())
            .any(|(d, on)| on && !d.is_zero())
    }
}

/// Yields `(duration, vibrating)` pairs. Endless for repeating patterns.
pub struct Segments {
    pattern: VibrationPattern,
    index: usize,
}

impl Iterator for Segments {
    type Item = (Duration, bool);

    fn next(&mut self) -> Option<Self::Item> {
        let timings = &self.pattern.timings;
        if self.index >= timings.len() {
            self.index = self.pattern.repeat?;
        }
        let i = self.index;
        self.index += 1;
        Some((timings[i], i % 2 == 1))
    }
}
