//! Domain models shared by the host and the front end.

pub mod report;
pub mod session;

pub use report::{CommandOutput, LaunchOutcome, LogsReport, RestartOutcome, StatusReport, StopOutcome};
pub use session::{LaunchOptions, SessionStatus};
