pub mod ask;
pub mod debug;
pub mod onboard;
pub mod repos;
