pub mod library_gateway;
pub mod notifier;

pub use library_gateway::{GatewayOp, ISSUE_PERIOD_DAYS, LibraryGateway};
pub use notifier::RecordingNotifier;
