//! Process-wide tracing setup shared by the pingwatch binaries.

mod tracing;

pub use self::tracing::init_tracing_with_level;
