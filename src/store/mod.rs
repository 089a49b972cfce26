pub mod book_store;
pub mod request_ledger;

pub use book_store::BookStore;
pub use request_ledger::RequestLedger;
