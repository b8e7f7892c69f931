// Domain layer: core models and ports (interfaces). No storage or presentation concerns.

pub mod model;
pub mod ports;
