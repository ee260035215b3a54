//! Domain models for capability caching, test discovery and verification.

pub mod capabilities;
pub mod config;
pub mod feature;
pub mod test_discovery;
pub mod verification;
pub mod verification_mode;

pub use capabilities::{
    CapabilitySnapshot, CapabilitySource, CommandCapability, CustomRule, DiskCacheEnvelope,
    E2eCapability, TestFramework, CAPABILITY_CACHE_VERSION,
};
pub use config::{
    AgentConfig, CapabilitiesConfig, ChecksConfig, Config, LoggingConfig, VerificationConfig,
};
pub use feature::{E2eTestRequirement, Feature, TestRequirements, UnitTestRequirement};
pub use test_discovery::{DiscoverySource, TestDiscoveryResult};
pub use verification::{
    AutomatedCheckResult, CheckType, CompactCheck, CompactCriterion, CriterionResult,
    FeatureSummary, LegacyStore, Verdict, VerificationIndex, VerificationMetadata,
    VerificationResult, VerificationStats, VERIFICATION_STORE_VERSION,
};
pub use verification_mode::{
    E2eMode, PhaseTracker, TestMode, VerificationMode, VerificationPhase, SMOKE_TAG,
};
