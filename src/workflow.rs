pub const WORKFLOW_NAME: &str = "METABOLOMICS-SNETS-V2";
pub const NOTIFICATION_EMAIL: &str = "nobody@ucsd.edu";

/// Fully built submission parameters for one molecular-networking job.
/// Constructed once, then read as a flat key/value form body; never
/// mutated after `parameters()` hands it to the invoker.
#[derive(Debug, Clone)]
pub struct JobSubmissionSpec {
    pub spectra_path: String,
    pub description: String,
    pub email: String,
}

impl JobSubmissionSpec {
    pub fn clustering(spectra_path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            spectra_path: spectra_path.into(),
            description: description.into(),
            email: NOTIFICATION_EMAIL.to_string(),
        }
    }

    /// The flat form body the ProteoSAFe InvokeTools endpoint expects. The
    /// scientific parameters are the stock networking defaults; only the
    /// spectra location and description vary per submission.
    pub fn parameters(&self) -> Vec<(String, String)> {
        let params: Vec<(&str, String)> = vec![
            ("workflow", WORKFLOW_NAME.to_string()),
            ("protocol", "None".to_string()),
            ("desc", self.description.clone()),
            ("library_on_server", "d.speclibs;".to_string()),
            ("spec_on_server", format!("d.{};", self.spectra_path)),
            ("tolerance.PM_tolerance", "2.0".to_string()),
            ("tolerance.Ion_tolerance", "0.5".to_string()),
            ("PAIRS_MIN_COSINE", "0.70".to_string()),
            ("MIN_MATCHED_PEAKS", "6".to_string()),
            ("TOPK", "10".to_string()),
            ("CLUSTER_MIN_SIZE", "2".to_string()),
            ("RUN_MSCLUSTER", "on".to_string()),
            ("MAXIMUM_COMPONENT_SIZE", "100".to_string()),
            ("MIN_MATCHED_PEAKS_SEARCH", "6".to_string()),
            ("SCORE_THRESHOLD", "0.7".to_string()),
            ("ANALOG_SEARCH", "0".to_string()),
            ("MAX_SHIFT_MASS", "100.0".to_string()),
            ("FILTER_STDDEV_PEAK_datasetsINT", "0.0".to_string()),
            ("MIN_PEAK_INT", "0.0".to_string()),
            ("FILTER_PRECURSOR_WINDOW", "1".to_string()),
            ("FILTER_LIBRARY", "1".to_string()),
            ("WINDOW_FILTER", "1".to_string()),
            ("CREATE_CLUSTER_BUCKETS", "1".to_string()),
            ("CREATE_ILI_OUTPUT", "0".to_string()),
            ("email", self.email.clone()),
            ("uuid", "1DCE40F7-1211-0001-979D-15DAB2D0B500".to_string()),
        ];
        params
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }
}
