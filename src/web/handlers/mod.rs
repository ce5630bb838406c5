// HTTP handlers, one file per resource.

pub mod model;
pub mod predict;
