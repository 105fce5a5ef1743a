//! Schmitt trigger period counter.

use super::Estimate;

/// Hysteresis as a fraction of the frame peak.
const HYSTERESIS: f32 = 0.3;

#[derive(Debug, Clone, Default)]
pub(crate) struct Schmitt;

impl Schmitt {
    pub(crate) fn detect(&mut self, frame: &[f32], sample_rate: f32) -> Estimate {
        let peak = frame.iter().fold(0.0f32, |m, x| m.max(x.abs()));
        if peak <= 0.0 {
            return Estimate::UNVOICED;
        }
        let threshold = HYSTERESIS * peak;

        let mut armed = false;
        let mut first = None;
        let mut last = 0;
        let mut triggers = 0usize;
        for (i, &x) in frame.iter().enumerate() {
            if x < -threshold {
                armed = true;
            } else if armed && x >= threshold {
                armed = false;
                first.get_or_insert(i);
                last = i;
                triggers += 1;
            }
        }

        match first {
            Some(first) if triggers >= 2 && last > first => Estimate {
                freq: sample_rate * (triggers - 1) as f32 / (last - first) as f32,
                confidence: 1.0,
            },
            _ => Estimate::UNVOICED,
        }
    }
}
