pub mod guess;
pub mod proxy;
