//! `phase0-node`: the orchestrator tying the slot clock, chain store and fork choice together
//! (spec.md §4.G). Everything else in this workspace is a pure function or a passive data
//! structure; this crate is the one place that is stateful *and* has an opinion about time.

pub mod cancellation;
pub mod clock;
pub mod error;
pub mod events;
pub mod logging;
pub mod orchestrator;
pub mod signer;

pub use cancellation::CancellationToken;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{NodeError, Result};
pub use events::{ChannelEventSink, Event, EventSink, NullEventSink};
pub use logging::{setup_logger, LogFormat, LoggingConfig};
pub use orchestrator::ChainUpdater;
pub use signer::Signer;
