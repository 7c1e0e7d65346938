//! Command variants: the memento-style `SimpleCommand` and the `CompositeCommand` macro.

pub mod command;
pub mod composite;

pub use command::*;
pub use composite::*;
