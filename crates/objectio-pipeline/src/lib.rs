//! Write/read/delete orchestration, quota gate, health monitor, GC
//! loop, and multipart upload for the ObjectIO gateway (spec §4, C7-C10).

pub mod delete;
pub mod gateway;
pub mod gc;
pub mod health;
pub mod monitor;
pub mod multipart;
pub mod quota;
pub mod read;
pub mod write;

#[cfg(test)]
mod test_support;

pub use gateway::Gateway;
pub use write::WriteOutcome;
