use std::fs::File;
use std::path::Path;

use suppaftp::FtpStream;
use tracing::{info, warn};

use crate::domain::Credentials;
use crate::error::GnpsError;

pub const FTP_HOST: &str = "ccms-ftp01.ucsd.edu";
pub const TOP_LEVEL_FOLDER: &str = "Qiime2";

/// Seam for depositing spectra into the per-user GNPS file store. Each
/// submission stages into `Qiime2/<group>` where `group` is a fresh unique
/// name, so concurrent ingestion calls never share a remote path.
pub trait SpectraStore: Send + Sync {
    fn stage(
        &self,
        files: &[std::path::PathBuf],
        group: &str,
        credentials: &Credentials,
    ) -> Result<(), GnpsError>;
}

pub struct FtpSpectraStore {
    host: String,
}

impl FtpSpectraStore {
    pub fn new() -> Self {
        Self {
            host: FTP_HOST.to_string(),
        }
    }

    pub fn with_host(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// Directory creation is idempotent: an already-existing folder is fine,
    /// and any other mkdir failure is only logged. If the folder truly is
    /// unusable the upload itself fails loudly right after.
    fn ensure_folder(ftp: &mut FtpStream, folder: &str) {
        let existing = ftp.nlst(None).unwrap_or_default();
        if existing.iter().any(|name| name == folder) {
            return;
        }
        if let Err(err) = ftp.mkdir(folder) {
            warn!(folder, error = %err, "cannot create remote folder");
        }
    }
}

impl Default for FtpSpectraStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectraStore for FtpSpectraStore {
    fn stage(
        &self,
        files: &[std::path::PathBuf],
        group: &str,
        credentials: &Credentials,
    ) -> Result<(), GnpsError> {
        let address = format!("{}:21", self.host);
        let mut ftp = FtpStream::connect(address.as_str())
            .map_err(|err| GnpsError::Ftp(err.to_string()))?;
        ftp.login(&credentials.username, &credentials.password)
            .map_err(|err| GnpsError::Ftp(err.to_string()))?;

        Self::ensure_folder(&mut ftp, TOP_LEVEL_FOLDER);
        ftp.cwd(TOP_LEVEL_FOLDER)
            .map_err(|err| GnpsError::Ftp(err.to_string()))?;
        Self::ensure_folder(&mut ftp, group);
        ftp.cwd(group)
            .map_err(|err| GnpsError::Ftp(err.to_string()))?;

        for path in files {
            let name = remote_name(path)?;
            let mut file = File::open(path)
                .map_err(|err| GnpsError::Filesystem(format!("open {}: {err}", path.display())))?;
            ftp.put_file(&name, &mut file)
                .map_err(|err| GnpsError::Ftp(format!("upload {name}: {err}")))?;
            info!(file = %path.display(), remote = %name, group, "staged spectra file");
        }

        let _ = ftp.quit();
        Ok(())
    }
}

/// Upload target name is the source basename.
fn remote_name(path: &Path) -> Result<String, GnpsError> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| GnpsError::Filesystem(format!("no file name in {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_name_is_basename() {
        let name = remote_name(Path::new("/data/runs/S1_raw.mzXML")).unwrap();
        assert_eq!(name, "S1_raw.mzXML");
    }

    #[test]
    fn remote_name_rejects_bare_root() {
        assert!(remote_name(Path::new("/")).is_err());
    }
}
