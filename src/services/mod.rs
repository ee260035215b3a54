pub mod capability_cache;
pub mod checks;
pub mod judgment;
pub mod orchestrator;
pub mod persistence;
pub mod test_discovery;
pub mod verification_store;

pub use capability_cache::{CapabilityCache, DetectOptions};
pub use checks::{CheckPlan, CheckRunner};
pub use judgment::{Judgment, JudgmentService};
pub use orchestrator::{
    OrchestratorSettings, VerificationOrchestrator, VerificationOutcome, VerifyOptions,
};
pub use test_discovery::TestDiscovery;
pub use verification_store::{CompatibilityWriter, MigrationReport, VerificationStore};
