pub mod controller;
pub mod loop_worker;
pub mod state;

pub use controller::CaptureController;
pub use state::{SessionState, SessionStatus};
