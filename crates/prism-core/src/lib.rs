//! Platform-independent core of prism: one shared visual state, evolved once per
//! frame from audio and color producers, kept inside a performance budget.
//!
//! Nothing here touches the DOM or a GPU. Front-ends supply a [`Clock`], a
//! [`PropertySink`] and producers, then call [`StateCoordinator::tick`] from
//! their frame loop.

pub mod batch;
pub mod clock;
pub mod constants;
pub mod coordinator;
pub mod device;
pub mod error;
pub mod events;
pub mod metrics;
pub mod participant;
pub mod producer;
pub mod quality;
pub mod state;
pub mod telemetry;
pub mod transition;

pub use batch::*;
pub use clock::*;
pub use coordinator::*;
pub use device::*;
pub use error::*;
pub use events::*;
pub use metrics::*;
pub use participant::Participant;
pub use producer::*;
pub use quality::*;
pub use state::*;
pub use telemetry::*;
pub use transition::*;
