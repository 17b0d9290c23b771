use std::path::PathBuf;

pub trait Configuration: Clone + Send + Sync + 'static {
    fn port(&self) -> String;
    fn database_url(&self) -> Option<String>;
    fn public_key_path(&self) -> PathBuf;
    fn daily_limit(&self) -> u64;
    /// Comma separated list of allowed origins, `*` allows any origin.
    fn cors_origins(&self) -> String;
}
