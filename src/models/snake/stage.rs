//! Module for the score-driven speed stage progression.
use log::info;

/// Seconds between movement steps at stage 0.
pub const BASE_TURN_INTERVAL: f32 = 0.35;
/// Multiplier applied to the turn interval on each stage advance.
pub const TURN_INTERVAL_INCREMENT: f32 = 0.75;
/// Highest reachable stage. Past it the interval stops shrinking.
pub const MAX_STAGE: u32 = 6;
/// Points awarded per food tile eaten.
pub const FOOD_SCORE: u32 = 50;

/// Per-match speed controller. The turn interval only ever shrinks as the
/// cumulative score climbs, until [`MAX_STAGE`] caps it.
#[derive(Debug, Clone)]
pub struct StageController {
    score: u32,
    stage: u32,
    turn_interval: f32,
}

impl Default for StageController {
    fn default() -> Self {
        Self::new()
    }
}

impl StageController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            score: 0,
            stage: 0,
            turn_interval: BASE_TURN_INTERVAL,
        }
    }

    /// Adds `points` to the running score and advances the stage once per
    /// multiple of 100 the new total crossed. Returns the new turn interval
    /// when at least one advance actually took effect.
    pub fn on_score_increment(&mut self, points: u32) -> Option<f32> {
        let before = self.score / 100;
        self.score += points;
        let crossings = self.score / 100 - before;

        let mut new_interval = None;
        for _ in 0..crossings {
            if let Some(interval) = self.advance_stage() {
                new_interval = Some(interval);
            }
        }
        new_interval
    }

    /// Moves to the next speed stage and shrinks the turn interval. A no-op
    /// returning `None` once [`MAX_STAGE`] is reached.
    pub fn advance_stage(&mut self) -> Option<f32> {
        if self.stage >= MAX_STAGE {
            return None;
        }
        self.stage += 1;
        self.turn_interval *= TURN_INTERVAL_INCREMENT;
        info!(
            "Stage {} reached, turn interval now {:.4}s",
            self.stage, self.turn_interval
        );
        Some(self.turn_interval)
    }

    /// Back to stage 0, base interval and zero score.
    pub fn reset(&mut self) {
        self.score = 0;
        self.stage = 0;
        self.turn_interval = BASE_TURN_INTERVAL;
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn stage(&self) -> u32 {
        self.stage
    }

    #[must_use]
    pub fn turn_interval(&self) -> f32 {
        self.turn_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_one_multiple_fires_once() {
        // 90 -> 140 crosses 100 and advances; 140 -> 190 crosses nothing.
        let mut stage = StageController::new();
        stage.on_score_increment(90);
        assert_eq!(stage.stage(), 0);
        let advanced = stage.on_score_increment(50);
        assert_eq!(stage.stage(), 1);
        let expected = BASE_TURN_INTERVAL * TURN_INTERVAL_INCREMENT;
        assert!((advanced.unwrap() - expected).abs() < f32::EPSILON);
        assert!((stage.turn_interval() - 0.2625).abs() < 1e-6);
        assert_eq!(stage.on_score_increment(50), None);
        assert_eq!(stage.stage(), 1);
    }

    #[test]
    fn two_food_scores_reach_the_first_stage() {
        let mut stage = StageController::new();
        assert_eq!(stage.on_score_increment(FOOD_SCORE), None);
        assert!(stage.on_score_increment(FOOD_SCORE).is_some());
        assert_eq!(stage.stage(), 1);
        assert_eq!(stage.score(), 100);
    }

    #[test]
    fn large_increment_crosses_multiple_stages() {
        let mut stage = StageController::new();
        let interval = stage.on_score_increment(250);
        assert_eq!(stage.stage(), 2);
        let expected = BASE_TURN_INTERVAL * TURN_INTERVAL_INCREMENT * TURN_INTERVAL_INCREMENT;
        assert!((interval.unwrap() - expected).abs() < 1e-6);
    }

    #[test]
    fn interval_is_monotonic_and_stage_capped() {
        let mut stage = StageController::new();
        let mut last = stage.turn_interval();
        for _ in 0..20 {
            stage.advance_stage();
            assert!(stage.turn_interval() <= last);
            last = stage.turn_interval();
        }
        assert_eq!(stage.stage(), MAX_STAGE);
        // Past the cap the interval is frozen.
        assert_eq!(stage.advance_stage(), None);
        assert!((stage.turn_interval() - last).abs() < f32::EPSILON);
    }

    #[test]
    fn score_past_cap_does_not_change_interval() {
        let mut stage = StageController::new();
        stage.on_score_increment(100 * (MAX_STAGE + 3));
        assert_eq!(stage.stage(), MAX_STAGE);
        let frozen = stage.turn_interval();
        assert_eq!(stage.on_score_increment(200), None);
        assert!((stage.turn_interval() - frozen).abs() < f32::EPSILON);
    }

    #[test]
    fn reset_restores_base_values() {
        let mut stage = StageController::new();
        stage.on_score_increment(450);
        stage.reset();
        assert_eq!(stage.score(), 0);
        assert_eq!(stage.stage(), 0);
        assert!((stage.turn_interval() - BASE_TURN_INTERVAL).abs() < f32::EPSILON);
    }
}
