//! Cart domain: value objects, aggregates and checkout events.
pub mod value_objects;
pub mod aggregates;
pub mod events;
