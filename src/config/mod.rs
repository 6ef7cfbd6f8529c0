mod settings;

pub use settings::{Command, Config, HealthSettings, Settings};
