// Domain layer: inbound order shape, target records and the store port.

pub mod model;
pub mod ports;
