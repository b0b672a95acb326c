use rand::Rng;
use std::collections::BTreeMap;

use crate::storage::registry::AgentRegistry;
use crate::types::{AgentId, Shift};

/// Shift members a donor shift must keep above before giving one away.
const MIN_DONOR_SIZE: usize = 5;

pub fn initial_shift(index: usize) -> Shift {
    Shift::ACTIVE[index % Shift::ACTIVE.len()]
}

/// Agents coming off break land on any active shift, not necessarily their last one.
pub fn pick_return_shift<R: Rng>(rng: &mut R) -> Shift {
    Shift::ACTIVE[rng.random_range(0..Shift::ACTIVE.len())]
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShiftTransfer {
    pub agent: AgentId,
    pub from: Shift,
    pub to: Shift,
}

/// Occasionally moves one working agent between active shifts.
pub fn plan_rotation<R: Rng>(
    registry: &AgentRegistry,
    chance: f64,
    rng: &mut R,
) -> Option<ShiftTransfer> {
    if chance <= 0.0 || rng.random::<f64>() >= chance {
        return None;
    }

    let from = Shift::ACTIVE[rng.random_range(0..Shift::ACTIVE.len())];
    let targets: Vec<Shift> = Shift::ACTIVE.into_iter().filter(|s| *s != from).collect();
    let to = targets[rng.random_range(0..targets.len())];

    let counts = registry.shift_counts();
    let from_count = counts.get(&from).copied().unwrap_or(0);
    let to_count = counts.get(&to).copied().unwrap_or(0);
    let recipient_cap = (registry.len() * 2 / 5).max(1);
    if from_count <= MIN_DONOR_SIZE || to_count >= recipient_cap {
        return None;
    }

    let members: Vec<&AgentId> = registry
        .iter()
        .filter(|a| a.shift == from && a.is_working())
        .map(|a| a.id())
        .collect();
    if members.is_empty() {
        return None;
    }
    let agent = members[rng.random_range(0..members.len())].clone();

    Some(ShiftTransfer { agent, from, to })
}

pub fn shift_summary(counts: &BTreeMap<Shift, usize>) -> String {
    [Shift::A, Shift::B, Shift::C, Shift::Break]
        .iter()
        .map(|s| format!("{}={}", s.as_str(), counts.get(s).copied().unwrap_or(0)))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_initial_shift_round_robin() {
        assert_eq!(initial_shift(0), Shift::A);
        assert_eq!(initial_shift(1), Shift::B);
        assert_eq!(initial_shift(2), Shift::C);
        assert_eq!(initial_shift(3), Shift::A);
    }

    #[test]
    fn test_return_shift_is_active() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            assert!(pick_return_shift(&mut rng).is_active());
        }
    }

    #[test]
    fn test_rotation_never_fires_with_zero_chance() {
        let registry = AgentRegistry::populate(&SimulationConfig::default());
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert!(plan_rotation(&registry, 0.0, &mut rng).is_none());
        }
    }

    #[test]
    fn test_rotation_moves_between_distinct_active_shifts() {
        let registry = AgentRegistry::populate(&SimulationConfig::default());
        let mut rng = StdRng::seed_from_u64(11);
        let transfer = (0..100)
            .find_map(|_| plan_rotation(&registry, 1.0, &mut rng))
            .expect("a rotation with chance 1.0");

        assert_ne!(transfer.from, transfer.to);
        assert!(transfer.from.is_active() && transfer.to.is_active());
        assert_eq!(registry.get(&transfer.agent).unwrap().shift, transfer.from);
    }

    #[test]
    fn test_rotation_respects_small_shifts() {
        let config = SimulationConfig {
            population: 9,
            ..Default::default()
        };
        let registry = AgentRegistry::populate(&config);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            assert!(plan_rotation(&registry, 1.0, &mut rng).is_none());
        }
    }

    #[test]
    fn test_shift_summary() {
        let mut counts = BTreeMap::new();
        counts.insert(Shift::A, 2);
        counts.insert(Shift::Break, 1);
        assert_eq!(shift_summary(&counts), "A=2 B=0 C=0 Break=1");
    }
}
