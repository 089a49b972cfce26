pub mod library_gateway;
pub mod notifier;

pub use library_gateway::LibraryGateway;
pub use notifier::{Notice, NoticeSeverity, Notifier};
