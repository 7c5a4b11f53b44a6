pub mod adapter;
pub mod cli;
pub mod definitions;
pub mod engine;
pub mod interaction;
pub mod steps;
pub mod storage;
