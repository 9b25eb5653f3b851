pub mod capture;
pub mod coordinator;
pub(crate) mod worker;
