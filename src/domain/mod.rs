// Domain layer: orders, needs and the ports to external systems.

pub mod model;
pub mod ports;
