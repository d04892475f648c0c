pub mod approval;
pub mod catalog;
pub mod employee_score;
pub mod monthly;
pub mod role;
pub mod settings;
pub mod sweep;
