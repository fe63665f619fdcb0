// Domain layer: entities, ports (interfaces) and the pure enrollment rules.

pub mod model;
pub mod ports;
pub mod rules;
