pub mod cases;
pub mod document;
pub mod points;
