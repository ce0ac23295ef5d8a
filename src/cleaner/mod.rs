pub mod deleter;
pub mod orchestrator;
pub mod trash;

pub use deleter::{BatchDeleteResult, Deletable, DeleteOptions, DeleteProgress, Deleter};
pub use orchestrator::{
    CandidateItem, CategoryScanResult, CleanOrchestrator, CleanOutcome, CleanState, ScanReport, ScanState,
};
pub use trash::TrashBin;
