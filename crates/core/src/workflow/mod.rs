pub mod engine;
pub mod states;

pub use engine::{
    deadline_on_entry, deadline_on_entry_with_window, is_editable, is_pending, is_terminal,
    ApprovalFlow, TransitionError, DEFAULT_APPROVAL_WINDOW_DAYS,
};
pub use states::{ApprovalEvent, ApprovalState, TransitionContext, TransitionOutcome};
