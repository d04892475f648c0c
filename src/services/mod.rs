pub mod approval_service;
pub mod checklist_service;
pub mod column_access;
pub mod deadline_sweeper;
pub mod monthly_tracking_service;
pub mod period_utils;
pub mod scoring_service;
pub mod settings_service;
