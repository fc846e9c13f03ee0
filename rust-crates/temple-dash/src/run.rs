use crate::Monanimal;
use leaderboard::{
    Score,
    Submission,
};
use rand::Rng;
use serde::{
    Deserialize,
    Serialize,
};

pub const MAX_SPEED: f64 = 3.0;
pub const MAX_POWER: f64 = 100.0;
/// Power lost per decay step (one step every 200ms of play).
pub const POWER_DECAY: f64 = 0.5;

const TICK_TOKEN_CHANCE: f64 = 0.1;
const TICK_POWER_CHANCE: f64 = 0.1;
const TICK_POWER_BONUS: f64 = 10.0;
const ACTION_TOKEN_CHANCE: f64 = 0.3;
const ACTION_TOKEN_BONUS: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Jump,
    Slide,
    DodgeLeft,
    DodgeRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerTier {
    Gold,
    Purple,
    Blue,
}

impl PowerTier {
    pub fn from_power(power: f64) -> Self {
        if power > 80.0 {
            PowerTier::Gold
        } else if power > 50.0 {
            PowerTier::Purple
        } else {
            PowerTier::Blue
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    character: Monanimal,
    distance: u64,
    tokens: u64,
    speed: f64,
    max_speed: f64,
    power: f64,
    running: bool,
}

/// Result of a finished run. The distance is the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub character: Monanimal,
    pub distance: u64,
    pub tokens: u64,
    pub max_speed: f64,
}

impl Run {
    pub fn new(character: Monanimal) -> Self {
        Self {
            character,
            distance: 0,
            tokens: 0,
            speed: 1.0,
            max_speed: 1.0,
            power: 0.0,
            running: false,
        }
    }

    pub fn character(&self) -> Monanimal {
        self.character
    }

    pub fn distance(&self) -> u64 {
        self.distance
    }

    pub fn tokens(&self) -> u64 {
        self.tokens
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn power(&self) -> f64 {
        self.power
    }

    pub fn power_tier(&self) -> PowerTier {
        PowerTier::from_power(self.power)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Switch runner between runs. Has no effect mid-run.
    pub fn select(&mut self, character: Monanimal) {
        if !self.running {
            self.character = character;
        }
    }

    pub fn start(&mut self) {
        *self = Self {
            running: true,
            ..Self::new(self.character)
        };
        tracing::debug!("run started with {}", self.character.name());
    }

    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if !self.running {
            return;
        }
        self.distance += (self.speed * self.character.speed()).floor() as u64;
        self.speed = MAX_SPEED.min(1.0 + self.distance as f64 / 1000.0);
        self.max_speed = self.max_speed.max(self.speed);
        if rng.random_bool(TICK_TOKEN_CHANCE) {
            self.tokens += rng.random_range(1..=3);
        }
        if rng.random_bool(TICK_POWER_CHANCE) {
            self.add_power(TICK_POWER_BONUS);
        }
    }

    pub fn perform<R: Rng + ?Sized>(&mut self, action: Action, rng: &mut R) {
        if !self.running {
            return;
        }
        let gain = match action {
            Action::Jump => self.character.jump() * 5.0,
            Action::Slide => self.character.slide() * 5.0,
            Action::DodgeLeft | Action::DodgeRight => self.character.speed() * 3.0,
        };
        self.add_power(gain);
        if rng.random_bool(ACTION_TOKEN_CHANCE) {
            self.tokens += ACTION_TOKEN_BONUS;
        }
    }

    pub fn decay(&mut self) {
        if self.running {
            self.power = (self.power - POWER_DECAY).max(0.0);
        }
    }

    pub fn finish(&mut self) -> RunSummary {
        self.running = false;
        RunSummary {
            character: self.character,
            distance: self.distance,
            tokens: self.tokens,
            max_speed: self.max_speed,
        }
    }

    fn add_power(&mut self, gain: f64) {
        self.power = MAX_POWER.min(self.power + gain);
    }
}

impl RunSummary {
    pub fn score(&self) -> Score {
        Score::from(self.distance)
    }

    /// The leaderboard call for this run, or `None` when the run cannot
    /// qualify under `min_score`.
    pub fn submission(
        &self,
        player_name: impl Into<String>,
        fid: u64,
        min_score: Score,
    ) -> Option<Submission> {
        let score = self.score();
        (score >= min_score).then(|| Submission::new(score, player_name, fid))
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use rand::{
        RngCore,
        SeedableRng,
        rngs::StdRng,
    };

    /// Every draw returns the same word, pinning each chance roll.
    struct ConstRng(u64);

    impl RngCore for ConstRng {
        fn next_u32(&mut self) -> u32 {
            self.0 as u32
        }

        fn next_u64(&mut self) -> u64 {
            self.0
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.fill(self.0 as u8);
        }
    }

    fn never() -> ConstRng {
        ConstRng(u64::MAX)
    }

    fn always() -> ConstRng {
        ConstRng(0)
    }

    #[test]
    fn new__initial_state() {
        let run = Run::new(Monanimal::Smantha);

        assert_eq!(run.distance(), 0);
        assert_eq!(run.tokens(), 0);
        assert_eq!(run.speed(), 1.0);
        assert_eq!(run.power(), 0.0);
        assert!(!run.is_running());
    }

    #[test]
    fn tick__not_running__is_noop() {
        let mut run = Run::new(Monanimal::Frycook);

        run.tick(&mut always());

        assert_eq!(run, Run::new(Monanimal::Frycook));
    }

    #[test]
    fn tick__advances_distance_by_speed_times_character_speed() {
        // given
        let mut run = Run::new(Monanimal::Frycook);
        run.start();

        // when
        run.tick(&mut never());

        // then
        assert_eq!(run.distance(), 1);
        assert!(run.speed() > 1.0);
        assert_eq!(run.tokens(), 0);
        assert_eq!(run.power(), 0.0);
    }

    #[test]
    fn tick__speed_is_capped() {
        // given
        let mut run = Run::new(Monanimal::Frycook);
        run.start();

        // when
        for _ in 0..5_000 {
            run.tick(&mut never());
        }

        // then
        assert_eq!(run.speed(), MAX_SPEED);
        assert!(run.distance() > 2_000);
    }

    #[test]
    fn tick__lucky_draws__award_tokens_and_power() {
        // given
        let mut run = Run::new(Monanimal::Mo);
        run.start();

        // when
        run.tick(&mut always());

        // then
        assert!((1..=3).contains(&run.tokens()));
        assert_eq!(run.power(), 10.0);
    }

    #[test]
    fn perform__jump_power_scales_with_character() {
        // given
        let mut run = Run::new(Monanimal::Fake0ne);
        run.start();

        // when
        run.perform(Action::Jump, &mut never());

        // then
        assert!((run.power() - 7.0).abs() < 1e-9);
        assert_eq!(run.tokens(), 0);
    }

    #[test]
    fn perform__dodge_uses_speed_and_may_award_tokens() {
        let mut run = Run::new(Monanimal::Fake0ne);
        run.start();

        run.perform(Action::DodgeLeft, &mut always());

        assert!((run.power() - 3.0).abs() < 1e-9);
        assert_eq!(run.tokens(), 2);
    }

    #[test]
    fn perform__power_capped_at_hundred() {
        let mut run = Run::new(Monanimal::NadOg);
        run.start();

        for _ in 0..50 {
            run.perform(Action::Slide, &mut never());
        }

        assert_eq!(run.power(), MAX_POWER);
        assert_eq!(run.power_tier(), PowerTier::Gold);
    }

    #[test]
    fn decay__never_goes_below_zero() {
        // given
        let mut run = Run::new(Monanimal::Smantha);
        run.start();
        run.perform(Action::Jump, &mut never());

        // when
        for _ in 0..100 {
            run.decay();
        }

        // then
        assert_eq!(run.power(), 0.0);
    }

    #[test]
    fn power_tier__thresholds() {
        assert_eq!(PowerTier::from_power(90.0), PowerTier::Gold);
        assert_eq!(PowerTier::from_power(80.0), PowerTier::Purple);
        assert_eq!(PowerTier::from_power(60.0), PowerTier::Purple);
        assert_eq!(PowerTier::from_power(30.0), PowerTier::Blue);
    }

    #[test]
    fn select__ignored_mid_run() {
        let mut run = Run::new(Monanimal::Smantha);
        run.start();

        run.select(Monanimal::Mo);
        assert_eq!(run.character(), Monanimal::Smantha);

        run.finish();
        run.select(Monanimal::Mo);
        assert_eq!(run.character(), Monanimal::Mo);
    }

    #[test]
    fn finish__summary_reflects_run() {
        // given
        let mut rng = StdRng::seed_from_u64(7);
        let mut run = Run::new(Monanimal::Shitposter);
        run.start();
        for _ in 0..200 {
            run.tick(&mut rng);
        }

        // when
        let summary = run.finish();

        // then
        assert!(!run.is_running());
        assert_eq!(summary.distance, run.distance());
        assert_eq!(summary.tokens, run.tokens());
        assert_eq!(summary.score(), Score::from(run.distance()));
        assert!(summary.max_speed >= 1.0);
    }

    #[test]
    fn start__resets_previous_run() {
        let mut run = Run::new(Monanimal::Smantha);
        run.start();
        run.tick(&mut always());
        run.finish();

        run.start();

        assert_eq!(run.distance(), 0);
        assert_eq!(run.tokens(), 0);
        assert!(run.is_running());
    }

    #[test]
    fn submission__below_minimum__is_none() {
        let summary = RunSummary {
            character: Monanimal::Mo,
            distance: 9,
            tokens: 0,
            max_speed: 1.0,
        };

        assert!(summary.submission("Mo", 1, 10).is_none());
        assert_eq!(
            summary.submission("Mo", 1, 5),
            Some(Submission::new(9, "Mo", 1))
        );
    }
}
