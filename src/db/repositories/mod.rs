pub mod approval_repository;
pub mod catalog_repository;
pub mod employee_score_repository;
pub mod monthly_tracking_repository;
