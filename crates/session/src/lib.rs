//! AlignView session engine
//!
//! The reactive core behind the comparison table: an ordered column store,
//! a global link set that keeps designated parameters synchronized across
//! columns, version-guarded asynchronous result fetching, and a pure
//! render projection.

pub mod coordinator;
pub mod fetcher;
pub mod projection;
pub mod registry;
pub mod store;

pub use coordinator::Session;
pub use fetcher::{FetchCompletion, FetchOutcome, FileFetcher, ResultFetcher};
pub use projection::{ParameterRow, ResultCell, TableProjection};
pub use registry::{ColumnContext, ParameterRegistry};
pub use store::{ColumnStore, SetOutcome};
