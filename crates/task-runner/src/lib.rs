//! Drives task files through the interpreter: reads them from the shared
//! directory, exports and measures the result, writes the result record and
//! consumes the task. Also hosts the live behavior loader and the
//! background monitor.

pub mod config;
pub mod errors;
pub mod export;
pub mod host;
pub mod log_stream;
pub mod metadata;
pub mod monitor;
pub mod reload;
pub mod runner;

pub use config::{artifact_stem, RunnerConfig};
pub use errors::{ExportError, HostFailure, RunnerError, TaskError};
pub use export::{export_all, export_one, ExportReport};
pub use host::{behavior_source, waiting_tasks, Host};
pub use log_stream::{read_log, JsonlLog};
pub use metadata::{check_interference, gather_metadata};
pub use monitor::{is_task_file, list_tasks, HostEvent, Monitor, PendingTasks};
pub use reload::{
    BehaviorLoader, BehaviorSource, FileSource, LoaderState, NoSource, ReloadError, ReloadOutcome,
};
pub use runner::{load_task, pump_for, root_component_name, RunOutcome, TaskRunner};
