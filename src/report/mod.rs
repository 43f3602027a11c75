pub mod extract;
pub mod sink;

pub use extract::{DesignReport, InstalledUnit, OperationSchedule};
pub use sink::{JsonDirectorySink, MemorySink, ResultSink};
