use crate::config::SimulationConfig;
use crate::types::{Lifecycle, Phase};

/// Per-hour drift of fatigue and motivation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WellbeingRates {
    pub fatigue_per_hour: f64,
    pub fatigue_recovery_per_hour: f64,
    pub motivation_decay_per_hour: f64,
    pub motivation_floor: f64,
}

impl WellbeingRates {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            fatigue_per_hour: config.fatigue_per_hour,
            fatigue_recovery_per_hour: config.fatigue_recovery_per_hour,
            motivation_decay_per_hour: config.motivation_decay_per_hour,
            motivation_floor: config.motivation_floor,
        }
    }
}

impl Default for WellbeingRates {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}

/// Fatigue builds while working and only decays on break.
pub fn drift(lifecycle: &mut Lifecycle, elapsed_hours: f64, rates: &WellbeingRates) {
    match lifecycle.phase {
        Phase::Working => {
            lifecycle.fatigue =
                (lifecycle.fatigue + rates.fatigue_per_hour * elapsed_hours).clamp(0.0, 1.0);
            let floor = rates.motivation_floor.min(lifecycle.motivation);
            lifecycle.motivation = (lifecycle.motivation
                - rates.motivation_decay_per_hour * elapsed_hours)
                .max(floor);
        }
        Phase::OnBreak => {
            lifecycle.fatigue = (lifecycle.fatigue
                - rates.fatigue_recovery_per_hour * elapsed_hours)
                .clamp(0.0, 1.0);
        }
    }
}

pub fn boost_motivation(lifecycle: &mut Lifecycle, amount: f64) {
    lifecycle.motivation = (lifecycle.motivation + amount).clamp(0.0, 1.0);
}

pub fn relieve_fatigue(lifecycle: &mut Lifecycle, amount: f64) {
    lifecycle.fatigue = (lifecycle.fatigue - amount).clamp(0.0, 1.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn working() -> Lifecycle {
        Lifecycle::fresh(8.0, 1.5, 0.8)
    }

    #[test]
    fn test_fatigue_builds_while_working() {
        let mut lifecycle = working();
        drift(&mut lifecycle, 5.0, &WellbeingRates::default());

        assert!((lifecycle.fatigue - 0.2).abs() < 1e-9);
        assert!((lifecycle.motivation - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_fatigue_and_motivation_are_bounded() {
        let mut lifecycle = working();
        drift(&mut lifecycle, 100.0, &WellbeingRates::default());

        assert_eq!(lifecycle.fatigue, 1.0);
        assert_eq!(lifecycle.motivation, 0.3);
    }

    #[test]
    fn test_motivation_below_floor_does_not_jump_up() {
        let mut lifecycle = working();
        lifecycle.motivation = 0.1;
        drift(&mut lifecycle, 1.0, &WellbeingRates::default());
        assert_eq!(lifecycle.motivation, 0.1);
    }

    #[test]
    fn test_fatigue_recovers_on_break() {
        let mut lifecycle = working();
        lifecycle.phase = Phase::OnBreak;
        lifecycle.fatigue = 0.5;
        drift(&mut lifecycle, 1.0, &WellbeingRates::default());

        assert!((lifecycle.fatigue - 0.3).abs() < 1e-9);
        assert_eq!(lifecycle.motivation, 0.8);
    }

    #[test]
    fn test_boost_and_relief_clamp() {
        let mut lifecycle = working();
        boost_motivation(&mut lifecycle, 0.5);
        assert_eq!(lifecycle.motivation, 1.0);

        relieve_fatigue(&mut lifecycle, 0.2);
        assert_eq!(lifecycle.fatigue, 0.0);
    }
}
