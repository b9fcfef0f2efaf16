// Domain layer: core models and ports (interfaces) shared by the pipeline stages.

pub mod model;
pub mod ports;
