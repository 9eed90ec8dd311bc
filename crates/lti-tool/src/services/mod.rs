pub mod key_management_service;
pub mod launch_service;
pub mod login_service;
pub mod registration_service;
