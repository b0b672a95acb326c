pub mod coordination;
pub mod driver;
pub mod propagation;
pub mod scheduler;

pub use coordination::{StepReport, Workforce};
pub use driver::{Driver, DriverHandle};
pub use propagation::PropagationOutcome;
pub use scheduler::{Scheduler, WorkEvent};
