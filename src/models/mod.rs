pub mod document;
pub mod job;
pub mod loaders;
pub mod membership;
pub mod result;

pub use document::{ImageReference, ImageRole, ParsedDocument, ResolvedImages};
pub use job::{JobOverrides, PublishJob, PublishMode};
pub use loaders::{list_documents, load_job, load_jobs, select_range, LoadOptions};
pub use membership::MembershipTier;
pub use result::{PaywallPlacement, PublishResult, PublishStage, TerminalState};
