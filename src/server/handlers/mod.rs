pub mod blogs;
pub mod install;
pub mod settings;

/// GET / -> liveness probe.
pub async fn health() -> &'static str {
    "ok"
}
