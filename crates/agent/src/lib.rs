//! Chat runtime: free-text inventory commands and catalog-grounded answers.
//!
//! # Architecture
//!
//! Every inbound message goes through the response router in `runtime`:
//! 1. **Creation pre-check** - "create product with title ..." goes straight to
//!    `catalog`, with the description written by `describe`
//! 2. **Generative path** (`ai` mode) - `context` renders a catalog snapshot and
//!    `llm` answers the question against it
//! 3. **Rule path** - `intent` classifies, `extract` pulls fields out of the
//!    text, `dispatcher` runs the catalog operation and `format` renders it
//!
//! # Key Types
//!
//! - `AgentRuntime` - the router (see `runtime` module)
//! - `CatalogService` - catalog operations shared with the typed endpoints
//! - `LlmClient` - pluggable generative backend, with a disabled fallback
//!
//! The generative backend never decides catalog writes. Creation, updates and
//! deletes run only through the deterministic rule path.

pub mod catalog;
pub mod context;
pub mod describe;
pub mod dispatcher;
pub mod errors;
pub mod extract;
pub mod format;
pub mod intent;
pub mod llm;
pub mod runtime;

pub use catalog::{CatalogRepositories, CatalogService};
pub use runtime::{AgentRuntime, BatchReply, ChatMode, ChatReply};
