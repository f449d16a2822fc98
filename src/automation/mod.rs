// Device automation module
// Per-device connect sessions built on visibility polls, and the daemon loop
// that sweeps all connected devices.

pub mod capture;
pub mod daemon;
pub mod poller;
pub mod session;
pub mod shutdown;
pub mod types;


// Re-export the main types and functions for easy access
pub use capture::{CaptureError, DeviceScreen, ScreenSource, artifact_path};
pub use daemon::{Daemon, SweepSummary, load_template};
pub use poller::{VisibilityPoller, transition};
pub use session::{DeviceSession, References, SessionError, vpn_is_up};
pub use shutdown::{Shutdown, ShutdownController};
pub use types::{Observation, PollMode, PollOutcome, PollReport, PollSpec, SessionOutcome};
