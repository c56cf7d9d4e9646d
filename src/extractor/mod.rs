pub mod models;
pub mod traits;
pub mod ytdlp;

pub use models::VideoInfo;
pub use traits::{ExtractOptions, Extractor, PostProcessor, ProgressHook, ProgressUpdate};
pub use ytdlp::YtDlpExtractor;
