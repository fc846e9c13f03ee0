//! Run model for Monanimal Temple Dash: the roster, the per-tick run state,
//! and the bookkeeping between runs. Rendering lives elsewhere; everything
//! here is driven by explicit calls and an injected RNG.

pub mod roster;
pub mod run;
pub mod session;

pub use roster::{
    Monanimal,
    UnknownMonanimal,
};
pub use run::{
    Action,
    PowerTier,
    Run,
    RunSummary,
};
pub use session::SessionStats;
