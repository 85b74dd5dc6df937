pub mod cursor;
pub mod model;
pub mod section;
pub mod writer;
pub mod progress;
pub mod options;
pub mod config;
pub mod export;
pub mod plugin;
pub mod print;
pub mod summary;
pub mod coordinator;
mod internal;

pub use cursor::DecodeError;
pub use model::ResultModel;
pub use progress::{Progress, ProgressSink};
pub use config::LoadConfig;
pub use export::{ExportConfig, ExportKey};
pub use plugin::{Action, Context, Message, Plugin, PluginError, PluginRegistry};
pub use summary::SummaryPlugin;
pub use coordinator::{decode_file, Coordinator, LoadError, LoadState};
