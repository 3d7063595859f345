pub mod clock;
pub mod jwt;
pub mod pagination;
pub mod token;
