pub mod comfort;
pub mod inspect;
pub mod solve;
pub mod validate;
