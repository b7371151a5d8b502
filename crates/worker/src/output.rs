use anyhow::Context;
use multibagger_core::export::CsvExport;
use std::path::{Path, PathBuf};

/// Writes `export` into `out_dir` under its own filename. The body goes to a sibling temp
/// file first and is renamed into place, so a reader never sees a half-written CSV.
pub fn write_export(out_dir: &Path, export: &CsvExport) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create output dir {}", out_dir.display()))?;

    let path = out_dir.join(&export.filename);
    let tmp = out_dir.join(format!(".{}.tmp", export.filename));

    std::fs::write(&tmp, export.body.as_bytes())
        .with_context(|| format!("write {}", tmp.display()))?;
    std::fs::rename(&tmp, &path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;

    Ok(path)
}
