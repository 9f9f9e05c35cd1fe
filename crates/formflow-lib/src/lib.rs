pub mod export;
pub mod runner;
pub mod session;
pub mod store;

pub use export::export_csv;
pub use runner::{AnswerProvider, SessionRunner};
pub use session::{FormSession, SessionError};
pub use store::{FormSource, JsonFileStore, StoreError, SubmissionSink, load_form_file};
