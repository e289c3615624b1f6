pub mod markdown_loader;

pub use markdown_loader::{list_documents, load_job, load_jobs, select_range, LoadOptions};
