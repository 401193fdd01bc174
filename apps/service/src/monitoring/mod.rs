/// Monitoring engine module - probes every registered check on a fixed
/// cadence and alerts owners when a check changes state
///
/// Per check and per cycle the pipeline is:
/// - read the raw record from the store
/// - validate it (`validation`)
/// - probe the target once (`checker`)
/// - derive the new state (`evaluator`)
/// - persist it and alert on transitions (`coordinator`)
///
/// `executor` drives the pipeline for a whole cycle and `scheduler` fires
/// cycles on a timer.
pub mod checker;
pub mod coordinator;
pub mod evaluator;
pub mod executor;
pub mod scheduler;
pub mod types;
pub mod validation;


pub use checker::HttpChecker;
pub use executor::MonitoringExecutor;
pub use scheduler::MonitoringScheduler;
pub use validation::CheckValidator;
