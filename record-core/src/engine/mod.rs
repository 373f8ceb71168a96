pub mod capture;
pub mod negotiator;
