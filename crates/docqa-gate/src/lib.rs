//! Retrieval gate: keeps the index usable and decides whether a query gets
//! an answer from the indexed documents or a refusal.

mod decision;
mod gate;
mod question;
mod state;

pub use decision::{decide, refusal, NO_RELEVANT_INFO};
pub use gate::RetrievalGate;
pub use question::{is_clear_question, MIN_QUESTION_CHARS, UNCLEAR_QUESTION};
pub use state::GateState;
