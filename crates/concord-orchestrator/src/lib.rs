//! Wires the matching core, the job queue, and the default out-of-the-box
//! collaborator implementations into one `Orchestrator` (§4.14). Binaries
//! depend on this crate rather than reimplementing the wiring.

pub mod config;
pub mod embeddings;
pub mod extractor;
pub mod fingerprint;
pub mod orchestrator;
pub mod profile_store;
pub mod task_handler;

pub use config::Config;
pub use embeddings::{NullEmbeddingsProvider, ReqwestEmbeddingsProvider};
pub use extractor::PlainTextExtractor;
pub use orchestrator::Orchestrator;
pub use profile_store::InMemoryProfileStore;
pub use task_handler::MatchTaskHandler;
