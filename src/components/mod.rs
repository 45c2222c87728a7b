pub mod layers;
pub mod tools;
