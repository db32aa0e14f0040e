use tracing::info;

use crate::data::StageStore;

use super::StageError;

/// Stage folders emptied when no stage is selected.
pub const DEFAULT_STAGES: [&str; 4] = ["preprocessing", "features", "model", "dashboard"];

/// Empty each stage folder; returns the number of entries removed.
pub fn clean_stages<S: AsRef<str>>(store: &StageStore, stages: &[S]) -> Result<usize, StageError> {
    let mut removed = 0;
    for stage in stages {
        removed += store.clean_stage(stage.as_ref())?;
    }
    info!("Removed {} entries from {} stage folders", removed, stages.len());
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_clean_selected_stages_only() {
        let dir = TempDir::new().unwrap();
        let store = StageStore::new(dir.path());
        for stage in DEFAULT_STAGES {
            fs::create_dir_all(store.stage_dir(stage)).unwrap();
            fs::write(store.stage_dir(stage).join("a.csv"), "Date\n").unwrap();
        }

        assert_eq!(clean_stages(&store, &["model", "dashboard"]).unwrap(), 2);
        assert!(store.stage_dir("features").join("a.csv").exists());
        assert!(!store.stage_dir("model").join("a.csv").exists());
        // Folders themselves are kept
        assert!(store.stage_dir("model").exists());
    }
}
