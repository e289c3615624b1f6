pub mod controls;
pub mod publish_ctx;
pub mod publish_flow;

pub use controls::EditorControls;
pub use publish_ctx::JobCtx;
pub use publish_flow::{choose_paywall_placement, markdown_to_html, FlowOptions, PublishFlow};
