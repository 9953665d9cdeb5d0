//! Domain types for the Swing Index System.

pub mod bar;
pub mod position;
pub mod side;
pub mod signal;

pub use bar::{validate_series, Bar, BarError};
pub use position::{ClosedPosition, OpenPosition, PositionError};
pub use side::Side;
pub use signal::{Direction, Signal, SignalReason};

/// Symbol type alias
pub type Symbol = String;
