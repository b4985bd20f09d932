mod runtime;

pub use runtime::TriageRuntime;
