use serde::{Deserialize, Serialize};

use super::wellbeing::{self, WellbeingRates};
use crate::config::SimulationConfig;
use crate::types::{Agent, AgentId, Phase, Shift, WorkItemId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    StartBreak,
    EndBreak,
}

/// Exhaustion rule for an early break.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExhaustionLimits {
    pub min_hours: f64,
    pub fatigue: f64,
}

impl ExhaustionLimits {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            min_hours: config.exhaustion_min_hours,
            fatigue: config.exhaustion_fatigue,
        }
    }

    /// Working hours until the early-break rule fires, assuming fatigue keeps building
    /// at the working rate. Infinite when it never will.
    pub fn hours_until_exhausted(&self, agent: &Agent, rates: &WellbeingRates) -> f64 {
        let lifecycle = &agent.lifecycle;
        let fatigue_wait = if lifecycle.fatigue > self.fatigue {
            0.0
        } else if self.fatigue >= 1.0 || rates.fatigue_per_hour <= 0.0 {
            return f64::INFINITY;
        } else {
            (self.fatigue - lifecycle.fatigue) / rates.fatigue_per_hour
        };
        fatigue_wait
            .max(self.min_hours - lifecycle.hours_in_phase)
            .max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    BreakStarted {
        agent: AgentId,
        hours_worked: f64,
        released: Option<WorkItemId>,
    },
    BreakEnded {
        agent: AgentId,
        shift: Shift,
    },
    ShiftTransferred {
        agent: AgentId,
        from: Shift,
        to: Shift,
    },
}

impl LifecycleEvent {
    pub fn describe(&self) -> String {
        match self {
            LifecycleEvent::BreakStarted {
                agent,
                hours_worked,
                released: Some(item),
            } => format!(
                "{} went on break after {:.1} hours, returning {} to the queue",
                agent, hours_worked, item
            ),
            LifecycleEvent::BreakStarted {
                agent,
                hours_worked,
                released: None,
            } => format!("{} went on break after {:.1} hours", agent, hours_worked),
            LifecycleEvent::BreakEnded { agent, shift } => format!(
                "{} returned from break to shift {}",
                agent,
                shift.as_str()
            ),
            LifecycleEvent::ShiftTransferred { agent, from, to } => format!(
                "{} transferred from shift {} to shift {}",
                agent,
                from.as_str(),
                to.as_str()
            ),
        }
    }
}

pub struct PhaseMachine;

impl PhaseMachine {
    /// Advances an agent's clock and reports the transition that is now due, if any.
    pub fn tick(
        agent: &mut Agent,
        elapsed_hours: f64,
        rates: &WellbeingRates,
        exhaustion: &ExhaustionLimits,
    ) -> Option<Transition> {
        let elapsed_hours = elapsed_hours.max(0.0);
        agent.lifecycle.hours_in_phase += elapsed_hours;
        wellbeing::drift(&mut agent.lifecycle, elapsed_hours, rates);
        Self::due(agent, exhaustion)
    }

    pub fn due(agent: &Agent, exhaustion: &ExhaustionLimits) -> Option<Transition> {
        let lifecycle = &agent.lifecycle;
        match lifecycle.phase {
            Phase::Working if lifecycle.hours_in_phase >= lifecycle.max_work_hours => {
                Some(Transition::StartBreak)
            }
            Phase::Working
                if lifecycle.hours_in_phase > exhaustion.min_hours
                    && lifecycle.fatigue > exhaustion.fatigue =>
            {
                Some(Transition::StartBreak)
            }
            Phase::OnBreak if lifecycle.hours_in_phase >= lifecycle.break_duration => {
                Some(Transition::EndBreak)
            }
            _ => None,
        }
    }

    /// Hours of work left before the agent's next break, scheduled or from exhaustion.
    pub fn hours_until_break(
        agent: &Agent,
        rates: &WellbeingRates,
        exhaustion: &ExhaustionLimits,
    ) -> f64 {
        match agent.lifecycle.phase {
            Phase::Working => {
                let scheduled =
                    (agent.lifecycle.max_work_hours - agent.lifecycle.hours_in_phase).max(0.0);
                scheduled.min(exhaustion.hours_until_exhausted(agent, rates))
            }
            Phase::OnBreak => 0.0,
        }
    }

    /// Moves the agent onto break and hands back the item it was holding.
    /// The caller must release that item in the same step.
    pub fn start_break(agent: &mut Agent) -> Option<WorkItemId> {
        agent.lifecycle.phase = Phase::OnBreak;
        agent.lifecycle.hours_in_phase = 0.0;
        agent.shift = Shift::Break;
        agent.current_work_item.take()
    }

    pub fn end_break(agent: &mut Agent, shift: Shift, motivation_boost: f64) {
        agent.lifecycle.phase = Phase::Working;
        agent.lifecycle.hours_in_phase = 0.0;
        agent.lifecycle.fatigue = 0.0;
        wellbeing::boost_motivation(&mut agent.lifecycle, motivation_boost);
        agent.shift = shift;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Lifecycle;

    const LIMITS: ExhaustionLimits = ExhaustionLimits {
        min_hours: 6.0,
        fatigue: 0.7,
    };

    fn create_test_agent(max_work_hours: f64) -> Agent {
        Agent::new(
            "ATLAS-01",
            2,
            "solar-string-design",
            Shift::A,
            Lifecycle::fresh(max_work_hours, 1.5, 0.6),
            0,
        )
    }

    #[test]
    fn test_no_transition_before_limit() {
        let mut agent = create_test_agent(8.0);
        let transition = PhaseMachine::tick(&mut agent, 7.5, &WellbeingRates::default(), &LIMITS);
        assert_eq!(transition, None);
        assert_eq!(agent.lifecycle.hours_in_phase, 7.5);
    }

    #[test]
    fn test_break_due_at_max_hours() {
        let mut agent = create_test_agent(6.0);
        agent.lifecycle.hours_in_phase = 5.9;
        let transition = PhaseMachine::tick(&mut agent, 0.2, &WellbeingRates::default(), &LIMITS);
        assert_eq!(transition, Some(Transition::StartBreak));
    }

    #[test]
    fn test_exhaustion_forces_early_break() {
        let mut agent = create_test_agent(10.0);
        agent.lifecycle.hours_in_phase = 6.5;
        agent.lifecycle.fatigue = 0.75;
        assert_eq!(
            PhaseMachine::due(&agent, &LIMITS),
            Some(Transition::StartBreak)
        );
    }

    #[test]
    fn test_start_break_releases_item_and_keeps_fatigue() {
        let mut agent = create_test_agent(6.0);
        let item = uuid::Uuid::new_v4();
        agent.current_work_item = Some(item);
        agent.lifecycle.hours_in_phase = 6.1;
        agent.lifecycle.fatigue = 0.4;

        let released = PhaseMachine::start_break(&mut agent);

        assert_eq!(released, Some(item));
        assert!(agent.current_work_item.is_none());
        assert_eq!(agent.lifecycle.phase, Phase::OnBreak);
        assert_eq!(agent.lifecycle.hours_in_phase, 0.0);
        assert_eq!(agent.lifecycle.fatigue, 0.4);
        assert_eq!(agent.shift, Shift::Break);
    }

    #[test]
    fn test_end_break_refreshes_agent() {
        let mut agent = create_test_agent(6.0);
        PhaseMachine::start_break(&mut agent);
        agent.lifecycle.fatigue = 0.3;

        let transition = PhaseMachine::tick(&mut agent, 1.5, &WellbeingRates::default(), &LIMITS);
        assert_eq!(transition, Some(Transition::EndBreak));

        PhaseMachine::end_break(&mut agent, Shift::C, 0.3);
        assert_eq!(agent.lifecycle.phase, Phase::Working);
        assert_eq!(agent.lifecycle.fatigue, 0.0);
        assert!((agent.lifecycle.motivation - 0.9).abs() < 1e-9);
        assert_eq!(agent.shift, Shift::C);
        assert!(agent.is_idle());
    }

    #[test]
    fn test_motivation_boost_is_clamped() {
        let mut agent = create_test_agent(6.0);
        agent.lifecycle.motivation = 0.95;
        PhaseMachine::start_break(&mut agent);
        PhaseMachine::end_break(&mut agent, Shift::A, 0.3);
        assert_eq!(agent.lifecycle.motivation, 1.0);
    }

    #[test]
    fn test_hours_until_break() {
        let rates = WellbeingRates::default();
        let mut agent = create_test_agent(6.0);
        agent.lifecycle.hours_in_phase = 5.5;
        assert_eq!(PhaseMachine::hours_until_break(&agent, &rates, &LIMITS), 0.5);

        PhaseMachine::start_break(&mut agent);
        assert_eq!(PhaseMachine::hours_until_break(&agent, &rates, &LIMITS), 0.0);
    }

    #[test]
    fn test_hours_until_break_counts_exhaustion() {
        let rates = WellbeingRates {
            fatigue_per_hour: 0.1,
            ..WellbeingRates::default()
        };
        let mut agent = create_test_agent(10.0);
        agent.lifecycle.hours_in_phase = 6.5;
        agent.lifecycle.fatigue = 0.6;

        // fatigue passes 0.7 one hour in, well before the 10 hour limit
        let until = PhaseMachine::hours_until_break(&agent, &rates, &LIMITS);
        assert!((until - 1.0).abs() < 1e-9);

        PhaseMachine::tick(&mut agent, until + 0.01, &rates, &LIMITS);
        assert_eq!(PhaseMachine::due(&agent, &LIMITS), Some(Transition::StartBreak));

        // below the minimum hours the rule waits even when already tired
        let mut agent = create_test_agent(10.0);
        agent.lifecycle.hours_in_phase = 4.0;
        agent.lifecycle.fatigue = 0.9;
        assert_eq!(PhaseMachine::hours_until_break(&agent, &rates, &LIMITS), 2.0);

        let calm = WellbeingRates {
            fatigue_per_hour: 0.0,
            ..rates
        };
        let mut agent = create_test_agent(10.0);
        agent.lifecycle.hours_in_phase = 7.0;
        assert_eq!(PhaseMachine::hours_until_break(&agent, &calm, &LIMITS), 3.0);
    }

    #[test]
    fn test_negative_elapsed_is_ignored() {
        let mut agent = create_test_agent(6.0);
        agent.lifecycle.hours_in_phase = 2.0;
        PhaseMachine::tick(&mut agent, -1.0, &WellbeingRates::default(), &LIMITS);
        assert_eq!(agent.lifecycle.hours_in_phase, 2.0);
    }
}
