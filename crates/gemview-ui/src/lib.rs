//! UI primitives used by the document widget.
//!
//! Nothing here knows about documents: these are the time-based and gesture
//! building blocks (eased values, clocks, frame tickers, click recognition).

pub mod animation;
pub mod click;
pub mod clock;
pub mod ticker;
