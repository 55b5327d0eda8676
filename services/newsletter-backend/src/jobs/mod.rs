/// Background execution of confirmation jobs.
pub mod confirmation;
pub mod worker;

pub use confirmation::{ConfirmationHandler, Error as ConfirmationError, JobOutcome};
pub use worker::{Processed, Worker};
