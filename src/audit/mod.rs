//! Run Audit
//!
//! Export finished runs and check them after the fact.
//!
//! ## Flow
//!
//! 1. A run ends and the engine holds its summary and keystroke log
//! 2. [`AnalyticsRun::from_engine`] packages and fingerprints it
//! 3. The run is stored or shipped as JSON or bincode
//! 4. [`verify_run`] re-checks the fingerprint and replays the log
//!
//! A replay only needs the run itself: seed, settings, timings and the
//! timestamped log fully determine the summary.

pub mod analytics;
pub mod replay;

pub use analytics::{compute_fingerprint, AnalyticsRun, AuditError, ANALYTICS_VERSION};
pub use replay::{replay_run, verify_run, VerificationError, VerificationResult};
