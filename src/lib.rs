pub mod avatar;
pub mod client;
pub mod error;
pub mod expression;
pub mod gate;
pub mod playback;
pub mod recorder;
pub mod traits;
pub mod tuning;

pub use avatar_realtime_types as types;
pub use avatar::{Avatar, AvatarEvent, AvatarHandle, Input, Parts};
pub use client::{connect, connect_with_config, ClientHandle, Config};
pub use tuning::Tuning;

#[cfg(feature = "utils")]
pub use avatar_realtime_utils as utils;
