//! Question-by-question traversal of a form.
//!
//! [`Traversal`] is the pure state machine: position, answers and the
//! submission lifecycle. [`FormSession`] binds a traversal to a store and
//! performs the write when `next` is called on the last question.

mod session;
mod state;

pub use session::{FormSession, Step, Submission};
pub use state::{PendingSubmission, Position, SubmitStatus, Transition, Traversal};
