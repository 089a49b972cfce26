mod errors;
mod session;

pub use errors::{CirculationError, OperationClass, Result};
pub use session::{
    CirculationSession, SessionDependencies, add_existing_books, create_book, issue_book,
    remove_book, request_issue, return_book, select_library, withdraw_request,
};
