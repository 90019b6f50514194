pub mod job;
pub mod likability;
pub mod rollup;
