pub mod agents;
pub mod clusters;
pub mod health;
