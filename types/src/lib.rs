pub mod command;
pub mod expression;
pub mod frame;
pub mod state;

pub use command::{AudioKind, ControlCommand, ParseError};
pub use expression::{ExpressionPreset, UnknownExpression};
pub use frame::FrameKind;
pub use state::{ConnectionState, GateState};
