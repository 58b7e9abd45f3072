pub mod applications;
pub mod progression;
