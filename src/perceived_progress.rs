use rand::Rng;

const CAP: u8 = 90;
const MAX_STEP: u8 = 15;

/// Cosmetic progress bar value shown while content is being generated.
///
/// It advances on UI ticks independently of the network call and says nothing about how far the
/// server actually is. Nothing may branch on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerceivedProgress {
    value: u8,
    running: bool,
}

impl PerceivedProgress {
    pub fn start(&mut self) {
        self.value = 0;
        self.running = true;
    }

    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if !self.running || self.value >= CAP {
            return;
        }
        let step = rng.random_range(1..=MAX_STEP);
        self.value = self.value.saturating_add(step).min(CAP);
    }

    /// Jump to 100 once the response has landed.
    pub fn complete(&mut self) {
        self.value = 100;
        self.running = false;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn percent(&self) -> u8 {
        self.value
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn ticks_never_pass_the_cap() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut progress = PerceivedProgress::default();
        progress.start();
        for _ in 0..200 {
            progress.tick(&mut rng);
            assert!(progress.percent() <= CAP);
        }
        assert_eq!(progress.percent(), CAP);
    }

    #[test]
    fn idle_progress_does_not_move_and_completion_jumps_to_full() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut progress = PerceivedProgress::default();
        progress.tick(&mut rng);
        assert_eq!(progress.percent(), 0);

        progress.start();
        progress.tick(&mut rng);
        assert!(progress.percent() > 0);
        progress.complete();
        assert_eq!(progress.percent(), 100);
        assert!(!progress.is_running());
        progress.reset();
        assert_eq!(progress.percent(), 0);
    }
}
