//! Simulation drivers: the closed loop and the offline algorithm tester

pub mod algorithm_tester;
pub mod closed_loop;
pub mod history;

pub use algorithm_tester::{AlgorithmTester, AnalyzerRun};
pub use closed_loop::ClosedLoopSimulator;
pub use history::{ControlSample, History, HistoryRecord};
