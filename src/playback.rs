pub use pending::{Directives, PendingCommands};
pub use queue::{AudioItem, AudioQueue};
pub use sequencer::{Advance, PlaybackSession, Sequencer, Started};

mod pending;
mod queue;
pub(crate) mod sequencer;
