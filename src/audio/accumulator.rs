//! Mono downmix and fixed-size, non-overlapping windowing.

use super::AnalysisError;

/// Collects mono samples until a full analysis window is available.
///
/// Windows never overlap: once a window is handed out the buffer starts
/// empty again, and a partial window is never handed out.
#[derive(Debug)]
pub struct FrameAccumulator {
    window_size: usize,
    buffer: Vec<f32>,
}

impl FrameAccumulator {
    pub fn new(window_size: usize) -> Result<Self, AnalysisError> {
        if window_size < 2 || !window_size.is_power_of_two() {
            return Err(AnalysisError::NotPowerOfTwo(window_size));
        }
        Ok(Self {
            window_size,
            buffer: Vec::with_capacity(window_size),
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Mono samples waiting for the next window.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Downmix interleaved frames and call `on_window` synchronously for
    /// every window completed. Returns the number of windows completed.
    ///
    /// A zero channel count is not a valid layout and the batch is dropped.
    /// Trailing samples that don't form a whole frame are ignored.
    pub fn push<F>(&mut self, interleaved: &[f32], channels: usize, mut on_window: F) -> usize
    where
        F: FnMut(&[f32]),
    {
        if channels == 0 {
            return 0;
        }
        let mut completed = 0;
        for frame in interleaved.chunks_exact(channels) {
            completed += self.push_mono(downmix(frame), &mut on_window);
        }
        completed
    }

    /// Feed `frames` mono zeros, as delivered by a packet flagged silent.
    pub fn push_silence<F>(&mut self, frames: usize, mut on_window: F) -> usize
    where
        F: FnMut(&[f32]),
    {
        let mut completed = 0;
        for _ in 0..frames {
            completed += self.push_mono(0.0, &mut on_window);
        }
        completed
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    fn push_mono<F>(&mut self, sample: f32, on_window: &mut F) -> usize
    where
        F: FnMut(&[f32]),
    {
        self.buffer.push(sample);
        if self.buffer.len() < self.window_size {
            return 0;
        }
        on_window(&self.buffer);
        self.buffer.clear();
        1
    }
}

/// Arithmetic mean of one interleaved frame.
pub fn downmix(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    frame.iter().sum::<f32>() / frame.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_opposites_cancel() {
        assert_eq!(downmix(&[1.0, -1.0]), 0.0);
    }

    #[test]
    fn mono_passes_through() {
        let mut acc = FrameAccumulator::new(4).unwrap();
        let mut seen = Vec::new();
        acc.push(&[0.1, -0.2, 0.3, -0.4], 1, |w| seen.push(w.to_vec()));
        assert_eq!(seen, vec![vec![0.1, -0.2, 0.3, -0.4]]);
    }

    #[test]
    fn averages_all_channels() {
        let mut acc = FrameAccumulator::new(2).unwrap();
        let mut seen = Vec::new();
        acc.push(&[0.0, 0.3, 0.6, 1.0, 1.0, 1.0], 3, |w| seen.push(w.to_vec()));
        assert_eq!(seen.len(), 1);
        assert!((seen[0][0] - 0.3).abs() < 1e-6);
        assert!((seen[0][1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn one_short_of_a_window_analyzes_nothing() {
        let mut acc = FrameAccumulator::new(1024).unwrap();
        let stereo = vec![0.5; 1023 * 2];
        let mut calls = 0;
        assert_eq!(acc.push(&stereo, 2, |_| calls += 1), 0);
        assert_eq!(calls, 0);
        assert_eq!(acc.pending(), 1023);
    }

    #[test]
    fn window_spanning_several_batches_fires_once() {
        let mut acc = FrameAccumulator::new(1024).unwrap();
        let mut calls = 0;
        for chunk in [300usize, 500, 224] {
            let stereo = vec![0.25; chunk * 2];
            acc.push(&stereo, 2, |w| {
                assert_eq!(w.len(), 1024);
                calls += 1;
            });
        }
        assert_eq!(calls, 1);
        assert_eq!(acc.pending(), 0);
    }

    #[test]
    fn two_windows_carry_no_leftover() {
        let mut acc = FrameAccumulator::new(8).unwrap();
        let samples: Vec<f32> = (0..16).map(|i| i as f32).collect();
        let mut windows = Vec::new();
        // Split off-boundary to make sure ordering survives batch edges.
        acc.push(&samples[..5], 1, |w| windows.push(w.to_vec()));
        acc.push(&samples[5..], 1, |w| windows.push(w.to_vec()));
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0], (0..8).map(|i| i as f32).collect::<Vec<_>>());
        assert_eq!(windows[1], (8..16).map(|i| i as f32).collect::<Vec<_>>());
        assert_eq!(acc.pending(), 0);
    }

    #[test]
    fn zero_channels_drops_batch() {
        let mut acc = FrameAccumulator::new(2).unwrap();
        let mut calls = 0;
        assert_eq!(acc.push(&[1.0, 1.0, 1.0], 0, |_| calls += 1), 0);
        assert_eq!(calls, 0);
        assert_eq!(acc.pending(), 0);
    }

    #[test]
    fn partial_trailing_frame_is_ignored() {
        let mut acc = FrameAccumulator::new(4).unwrap();
        acc.push(&[1.0, 1.0, 0.5], 2, |_| {});
        assert_eq!(acc.pending(), 1);
    }

    #[test]
    fn silence_counts_toward_windows() {
        let mut acc = FrameAccumulator::new(4).unwrap();
        let mut windows = Vec::new();
        acc.push(&[1.0, 1.0], 1, |w| windows.push(w.to_vec()));
        acc.push_silence(4, |w| windows.push(w.to_vec()));
        assert_eq!(windows, vec![vec![1.0, 1.0, 0.0, 0.0]]);
        assert_eq!(acc.pending(), 2);
    }

    #[test]
    fn rejects_non_power_of_two_window() {
        assert!(FrameAccumulator::new(1000).is_err());
        assert!(FrameAccumulator::new(1).is_err());
        assert!(FrameAccumulator::new(0).is_err());
    }
}
