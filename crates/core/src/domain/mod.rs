pub mod agent;
pub mod goal;
pub mod result;
