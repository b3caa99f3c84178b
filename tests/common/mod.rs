#![allow(dead_code)]

mod fixture;
pub use fixture::{Fixture, TWO_GROUPS_DATASET};

mod runner;
pub use runner::{read_table, PopgenRunner};
