// Domain layer: models, ports and the pure rules the probes check responses against.

pub mod detection;
pub mod model;
pub mod ports;
pub mod vin;
