mod app_dirs;

pub use app_dirs::AppDirs;
