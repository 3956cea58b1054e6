use std::collections::BTreeMap;
use std::path::PathBuf;

use cad_authority::{AuthorityBundle, AuthorityError, ExportFormat, MeshRefinement};
use task_engine::Journal;

use crate::config::RunnerConfig;
use crate::errors::ExportError;

/// Files written for one task and the formats that failed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExportReport {
    pub files: BTreeMap<String, PathBuf>,
    /// `"Export <fmt>: <reason>"` per failed format.
    pub errors: Vec<String>,
}

/// Write the export artifact of every requested format.
///
/// Each format is attempted on its own. Only a host-fatal authority error
/// stops the loop and is returned.
pub fn export_all(
    kb: &mut dyn AuthorityBundle,
    task_id: &str,
    formats: &[String],
    config: &RunnerConfig,
    journal: &mut Journal<'_>,
) -> Result<ExportReport, AuthorityError> {
    let mut report = ExportReport::default();
    for name in formats {
        match export_one(kb, task_id, name, config) {
            Ok(path) => {
                journal.info(format!("Exported {}: {}", name, path.display()));
                report.files.insert(name.clone(), path);
            }
            Err(ExportError::Authority(e)) if e.is_host_fatal() => return Err(e),
            Err(e) => {
                let message = format!("Export {name}: {e}");
                journal.error(message.clone());
                report.errors.push(message);
            }
        }
    }
    Ok(report)
}

/// Export the open design in one format to
/// [`RunnerConfig::export_path`].
pub fn export_one(
    kb: &mut dyn AuthorityBundle,
    task_id: &str,
    name: &str,
    config: &RunnerConfig,
) -> Result<PathBuf, ExportError> {
    let format = ExportFormat::from_name(name).ok_or_else(|| ExportError::UnknownFormat {
        format: name.to_string(),
    })?;
    let dir = &config.exports_dir;
    std::fs::create_dir_all(dir).map_err(|e| ExportError::Directory {
        path: dir.clone(),
        reason: e.to_string(),
    })?;
    let path = config.export_path(task_id, format.extension());
    kb.export(format, &path, MeshRefinement::Medium)?;
    Ok(path)
}
