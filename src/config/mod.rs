//! Configuration
//!
//! デフォルト値 → TOMLファイル → 環境変数 の順に重ねた設定

pub mod loader;
pub mod types;

pub use loader::{ConfigLoader, ENV_PREFIX};
pub use types::{AppConfig, LogFormat, LoggingConfig, StorageConfig};
