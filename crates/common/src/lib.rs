pub mod errors;
pub mod event_bus;
pub mod structured_logging;
pub mod topics;

pub use errors::{ErrorSeverity, HasSeverity, ValidationErrors};
pub use event_bus::{EventBus, EventEnvelope, Topic};
pub use structured_logging::{
    init_structured_logging, LoggingConfig, OperationTimer, StructuredLogEntry,
};
