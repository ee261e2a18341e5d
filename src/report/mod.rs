//! Report generation.

pub mod generator;

pub use generator::render;
