pub mod graceful_shutdown;

pub use graceful_shutdown::{GracefulShutdown, ShutdownSignal};
