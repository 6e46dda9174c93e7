/// Application settings loaded from environment variables
pub mod settings;

pub use settings::AppConfig;
