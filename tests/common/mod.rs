#![allow(dead_code)]

pub mod listeners;
pub mod strategies;

pub use listeners::*;
#[allow(unused_imports)]
pub use strategies::*;
