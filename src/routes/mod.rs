pub mod auth;

pub mod users;

pub mod departments;

pub mod levels;

pub mod classes;

pub mod lessons;

pub mod attendance;

pub mod dashboard;

pub mod system;

pub use attendance::configure_attendance_routes;
pub use auth::configure_auth_routes;
pub use classes::configure_classes_routes;
pub use dashboard::configure_dashboard_routes;
pub use departments::configure_department_routes;
pub use lessons::configure_lesson_routes;
pub use levels::configure_level_routes;
pub use system::configure_system_routes;
pub use users::configure_user_routes;
