pub mod book;
pub mod circulation;
pub mod commands;
pub mod errors;
pub mod events;
pub mod issue_request;
pub mod library;
pub mod value_objects;

pub use book::{Book, CirculationStatus};
pub use circulation::BookAction;
pub use errors::*;
pub use events::*;
pub use issue_request::IssueRequest;
pub use library::{Library, can_edit_library};
pub use value_objects::*;
