// Domain layer: records, value types and the ports the pipelines depend on.

pub mod model;
pub mod ports;
