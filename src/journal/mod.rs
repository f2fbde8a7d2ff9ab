//! Journal coordination for Wayfarer
//!
//! Everything the presentation layer touches lives here: the observable
//! [`JournalState`], the [`JournalController`] that owns it, and the
//! [`LocationDraft`] that carries edits up to the validation gate.

pub mod controller;
pub mod draft;
pub mod state;

pub use controller::JournalController;
pub use draft::LocationDraft;
pub use state::JournalState;
