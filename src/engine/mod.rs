pub mod condition;
pub mod context;
pub mod executor;
pub mod interpolate;
pub mod outcome;
pub mod types;
pub mod validate;
