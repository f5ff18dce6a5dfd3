use std::fs;
use std::path::{Path, PathBuf};

use job_scraper::Job;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File error: '{0}'")]
    Io(#[from] std::io::Error),
    #[error("Csv error: '{0}'")]
    Csv(#[from] csv::Error),
}

/// Destination for the records of a finished crawl.
pub trait ResultSink {
    fn write(&self, jobs: &[Job]) -> Result<()>;
}

/// Writes jobs as CSV, header first. The file only appears once every row
/// made it to disk.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".partial");
        PathBuf::from(staging)
    }

    fn write_rows(&self, path: &Path, jobs: &[Job]) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        writer.write_record(Job::FIELDS)?;
        for job in jobs {
            writer.serialize(job)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl ResultSink for CsvSink {
    fn write(&self, jobs: &[Job]) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let staging = self.staging_path();
        if let Err(e) = self.write_rows(&staging, jobs) {
            log::error!("failed writing {}: {}", staging.display(), e);
            let _ = fs::remove_file(&staging);
            return Err(e);
        }
        if let Err(e) = fs::rename(&staging, &self.path) {
            log::error!(
                "failed moving {} to {}: {}",
                staging.display(),
                self.path.display(),
                e
            );
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }
        log::info!("wrote {} jobs to {}", jobs.len(), self.path.display());
        Ok(())
    }
}
