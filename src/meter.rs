use bandtap::SmoothedBands;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

const SCALE: u64 = 100;

/// Three live bars, one per band, scaled to 0..=100.
pub struct BandMeters {
    bass: ProgressBar,
    mids: ProgressBar,
    treble: ProgressBar,
}

impl BandMeters {
    pub fn new() -> anyhow::Result<Self> {
        let style = ProgressStyle::default_bar()
            .template("{prefix:>6} {bar:50.cyan/blue} {msg}")?
            .progress_chars("█▉░");

        let multi = MultiProgress::new();
        let bar = |name: &'static str| {
            let bar = multi.add(ProgressBar::new(SCALE));
            bar.set_style(style.clone());
            bar.set_prefix(name);
            bar
        };
        let bass = bar("bass");
        let mids = bar("mids");
        let treble = bar("treble");

        Ok(Self {
            bass,
            mids,
            treble,
        })
    }

    pub fn update(&self, bands: SmoothedBands) {
        set_level(&self.bass, bands.bass);
        set_level(&self.mids, bands.mids);
        set_level(&self.treble, bands.treble);
    }

    /// Leave the last levels on screen.
    pub fn finish(self) {
        self.bass.abandon();
        self.mids.abandon();
        self.treble.abandon();
    }
}

fn set_level(bar: &ProgressBar, value: f32) {
    bar.set_position(level(value));
    bar.set_message(format!("{:.3}", value));
}

fn level(value: f32) -> u64 {
    (value.clamp(0.0, 1.0) * SCALE as f32).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_scale_and_clamp() {
        assert_eq!(level(0.0), 0);
        assert_eq!(level(0.512), 51);
        assert_eq!(level(1.0), 100);
        assert_eq!(level(1.7), 100);
        assert_eq!(level(-0.2), 0);
    }
}
