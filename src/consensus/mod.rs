// Consensus checks: proof of work and header/block validation

pub mod pow;
pub mod validation;

pub use pow::Target;
pub use validation::{median_time_past, HeaderValidator, ValidationError};
