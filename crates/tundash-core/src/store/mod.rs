// ── Configuration storage ──
//
// The local copy of the remote tunnel configuration and the
// fetch-mutate-push cycle that keeps it in step with the backend.

mod config_store;

pub use config_store::ConfigStore;
