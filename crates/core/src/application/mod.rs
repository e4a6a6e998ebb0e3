// Application Layer - Use Cases and Business Logic

pub mod cancel;
pub mod constants;
pub mod orchestrator;
pub mod poller;
pub mod retry;
pub mod submitter;

// Re-exports
pub use cancel::{cancel_channel, CancelSender, CancelToken};
pub use orchestrator::{Orchestrator, OrchestratorSettings};
pub use poller::{PollError, PollSettings, StatusPoller};
pub use retry::{RetryDecision, RetryError, RetryPolicy};
pub use submitter::{SubmitError, Submitter};
