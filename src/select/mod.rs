//! Model selection: candidate sets, AICc ranking, dredging, and the
//! pretending-variable refinement.
//!
//! Responsibilities:
//!
//! - build the structural and mechanism candidate sets
//! - fit every candidate and rank by AICc (fit failures become skips)
//! - enumerate marginality-respecting sub-models of the global specification
//! - flag pretending variables and re-dredge once without them

pub mod candidates;
pub mod dredge;
pub mod pretend;
pub mod rank;

pub use candidates::*;
pub use dredge::*;
pub use pretend::*;
pub use rank::*;
