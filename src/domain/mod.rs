// Domain layer: value objects and the ports to external collaborators.

pub mod model;
pub mod ports;
