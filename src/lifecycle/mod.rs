pub mod shifts;
pub mod state_machine;
pub mod wellbeing;

pub use shifts::{pick_return_shift, plan_rotation, ShiftTransfer};
pub use state_machine::{ExhaustionLimits, LifecycleEvent, PhaseMachine, Transition};
pub use wellbeing::WellbeingRates;
