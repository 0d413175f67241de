pub mod batch;
pub mod evaluation;
pub mod frame;
pub mod patient;
