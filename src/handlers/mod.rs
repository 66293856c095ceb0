pub mod api;
pub mod print;
pub mod spa;
