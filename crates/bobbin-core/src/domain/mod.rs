//! Domain model (payload, handles, protocol messages, states, errors).

pub mod errors;
pub mod ids;
pub mod memory;
pub mod payload;
pub mod protocol;
pub mod state;

pub use self::errors::{BootstrapError, BoxError, LaunchError, SpawnError};
pub use self::ids::WorkerId;
pub use self::memory::{MAX_PAGES, MemoryError, PAGE_SIZE, SharedMemory};
pub use self::payload::{CompiledModule, StartupPayload, WorkerOptions, WorkerState};
pub use self::protocol::{
    InboundMessage, LifecycleSignal, OutboundMessage, ProtocolViolation, STARTED, ViolationSide,
    WorkerEvent,
};
pub use self::state::{BootstrapPhase, ReadinessState};
