//! Behavioural suites, one per pipeline concern.

mod branch;
mod memory;
mod pipeline;
