pub mod cases;
pub mod points;
