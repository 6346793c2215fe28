// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "ctf/mod.rs"]
pub mod ctf;
