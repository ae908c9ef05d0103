// Priority ranking and the derivation pipeline
pub mod filtering;
pub mod pipeline;
pub mod priority;
pub mod rollup;
pub mod sorting;

// Interactive state
pub mod expansion;
pub mod view_config;
