//! Cross-platform application paths

use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppPaths {
    data_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Result<Self, String> {
        let data_dir = Self::get_data_dir()?;

        // Ensure directories exist
        fs::create_dir_all(&data_dir)
            .map_err(|e| format!("Failed to create data directory: {}", e))?;
        let exports = data_dir.join("exports");
        fs::create_dir_all(&exports)
            .map_err(|e| format!("Failed to create exports directory: {}", e))?;

        Ok(Self { data_dir })
    }

    fn get_data_dir() -> Result<PathBuf, String> {
        let base = dirs::data_dir().ok_or("Could not determine data directory")?;
        Ok(base.join("kikiwake"))
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    pub fn manifest_file(&self) -> PathBuf {
        self.data_dir.join("manifest.json")
    }

    pub fn kimariji_file(&self) -> PathBuf {
        self.data_dir.join("kimariji.json")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.data_dir.join("audio")
    }

    /// Per-session results file, keyed the same way as the remote log stream.
    pub fn export_file(&self, participant_id: &str, session_unix_secs: u64) -> PathBuf {
        self.data_dir
            .join("exports")
            .join(format!("kikiwake_main_{participant_id}_{session_unix_secs}.csv"))
    }
}
