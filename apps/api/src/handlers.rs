pub mod audit;
pub mod consents;
pub mod health;
pub mod visitors;
pub mod visits;
pub mod ws;
