pub mod elements;
pub mod scripts;
pub mod session;
