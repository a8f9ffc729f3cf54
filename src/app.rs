use std::path::Path;

use tracing::info;
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::domain::{Credentials, TaskId};
use crate::error::GnpsError;
use crate::gnps::{GnpsClient, wait_for_completion};
use crate::manifest::Manifest;
use crate::staging::{SpectraStore, TOP_LEVEL_FOLDER};
use crate::table::AbundanceTable;
use crate::workflow::JobSubmissionSpec;

/// Remote job lifecycle orchestrator. Owns every intermediate artifact of
/// an ingestion call: the staged remote folder, the submitted task, and the
/// scratch copy of the downloaded bucket table.
pub struct App<G: GnpsClient, S: SpectraStore> {
    gnps: G,
    spectra: S,
}

impl<G: GnpsClient, S: SpectraStore> App<G, S> {
    pub fn new(gnps: G, spectra: S) -> Self {
        Self { gnps, spectra }
    }

    /// Full pipeline: stage spectra, submit a networking job, wait for it,
    /// download its bucket table and relabel the sample axis. Steps run
    /// strictly in that order; every manifest path must exist on disk
    /// before the first remote interaction.
    pub fn import_clustering(
        &self,
        manifest_path: &Path,
        credentials_path: &Path,
        cancel: &CancelToken,
    ) -> Result<AbundanceTable, GnpsError> {
        let manifest = Manifest::load(manifest_path)?;
        manifest.verify_files_exist()?;
        let sid_map = manifest.stem_map();
        let credentials = Credentials::load(credentials_path)?;

        let remote_folder = Uuid::new_v4().to_string();
        info!(folder = %remote_folder, files = manifest.rows().len(), "staging spectra");
        self.spectra
            .stage(&manifest.filepaths(), &remote_folder, &credentials)?;

        let spectra_path = format!(
            "{}/{}/{}",
            credentials.username, TOP_LEVEL_FOLDER, remote_folder
        );
        let spec = JobSubmissionSpec::clustering(
            spectra_path,
            format!("Qiime2 Analysis {remote_folder}"),
        );
        let task = self.submit(&spec, &credentials)?;
        info!(task = %task, "GNPS job submitted");

        wait_for_completion(&self.gnps, &task, cancel)?;
        self.table_from_task(&task, &sid_map)
    }

    /// Ingests the output of an already-submitted task. No staging and no
    /// submission; manifest paths are not required to exist since only the
    /// identity mapping is needed.
    pub fn import_from_task(
        &self,
        manifest_path: &Path,
        task: &TaskId,
        cancel: &CancelToken,
    ) -> Result<AbundanceTable, GnpsError> {
        wait_for_completion(&self.gnps, task, cancel)?;
        let manifest = Manifest::load(manifest_path)?;
        self.table_from_task(task, &manifest.stem_map())
    }

    /// Ingests a bucket table that is already on local disk.
    pub fn import_from_buckettable(
        &self,
        manifest_path: &Path,
        buckettable_path: &Path,
    ) -> Result<AbundanceTable, GnpsError> {
        let manifest = Manifest::load(manifest_path)?;
        let mut table = AbundanceTable::from_buckettable(buckettable_path)?;
        table.relabel_samples(&manifest.stem_map());
        Ok(table)
    }

    /// Ingests an MZmine2 quantification report directly, with no remote
    /// job. Raw sample labels resolve by basename, not by file stem.
    pub fn import_mzmine(
        &self,
        manifest_path: &Path,
        report_path: &Path,
    ) -> Result<AbundanceTable, GnpsError> {
        let manifest = Manifest::load(manifest_path)?;
        AbundanceTable::from_mzmine_report(report_path, &manifest.basename_map())
    }

    fn submit(&self, spec: &JobSubmissionSpec, credentials: &Credentials) -> Result<TaskId, GnpsError> {
        let handle = self
            .gnps
            .invoke(&spec.parameters(), credentials)?
            .ok_or(GnpsError::TaskNotCreated)?;
        // A tentative handle passed the 4..=60 window; only an exactly
        // 32-character id is a genuine task. Anything else is the service's
        // error text, kept verbatim for diagnostics.
        handle
            .parse::<TaskId>()
            .map_err(|_| GnpsError::SubmissionRejected(handle))
    }

    /// Downloads the task's bucket table into a private scratch file,
    /// parses it and relabels samples. The scratch file is removed on every
    /// exit path by the tempfile guard.
    fn table_from_task(
        &self,
        task: &TaskId,
        sid_map: &std::collections::HashMap<String, String>,
    ) -> Result<AbundanceTable, GnpsError> {
        let scratch = tempfile::Builder::new()
            .prefix("gnps-buckets")
            .suffix(".tsv")
            .tempfile()
            .map_err(|err| GnpsError::Filesystem(err.to_string()))?;

        self.gnps.download_buckettable(task, scratch.path())?;
        let mut table = AbundanceTable::from_buckettable(scratch.path())?;
        table.relabel_samples(sid_map);
        Ok(table)
    }
}
