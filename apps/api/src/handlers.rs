pub mod blueprints;
pub mod devices;
pub mod enrollment;
pub mod health;
pub mod workflows;
