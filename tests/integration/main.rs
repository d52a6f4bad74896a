//! Integration tests

mod common;
mod config_test;
mod gate_test;
mod lifecycle_test;
mod pipeline_test;
mod restart_test;
