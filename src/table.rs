use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::GnpsError;

/// Column-header marker for per-sample abundance columns in MZmine2
/// quantification reports: `<raw sample file> Peak area`.
pub const PEAK_AREA_MARKER: &str = "Peak area";

const FEATURE_ID_COLUMN: &str = "row ID";
const MZ_COLUMN: &str = "row m/z";
const RT_COLUMN: &str = "row retention time";

/// Feature table header used by the bucket-table exchange format.
const OTU_ID_HEADER: &str = "#OTU ID";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMetadata {
    pub mz: f64,
    pub retention_time: f64,
}

/// Feature-by-sample abundance matrix. Feature identifiers stay strings
/// even when they look numeric, so identifier equality survives downstream.
/// After assembly the sample axis carries logical sample names, not raw
/// filenames or remote column headers.
#[derive(Debug, Clone)]
pub struct AbundanceTable {
    feature_ids: Vec<String>,
    sample_ids: Vec<String>,
    values: Vec<Vec<f64>>,
    feature_metadata: Option<Vec<FeatureMetadata>>,
}

impl AbundanceTable {
    pub fn new(
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
        values: Vec<Vec<f64>>,
        feature_metadata: Option<Vec<FeatureMetadata>>,
    ) -> Self {
        debug_assert_eq!(feature_ids.len(), values.len());
        Self {
            feature_ids,
            sample_ids,
            values,
            feature_metadata,
        }
    }

    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn feature_metadata(&self) -> Option<&[FeatureMetadata]> {
        self.feature_metadata.as_deref()
    }

    pub fn num_features(&self) -> usize {
        self.feature_ids.len()
    }

    pub fn num_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn value(&self, feature: &str, sample: &str) -> Option<f64> {
        let row = self.feature_ids.iter().position(|id| id == feature)?;
        let col = self.sample_ids.iter().position(|id| id == sample)?;
        Some(self.values[row][col])
    }

    /// Rewrites the sample axis through an identity mapping. Headers the
    /// mapping does not cover keep their raw label; the service can emit
    /// bookkeeping columns the manifest never names.
    pub fn relabel_samples(&mut self, mapping: &HashMap<String, String>) {
        for sample in &mut self.sample_ids {
            if let Some(logical) = mapping.get(sample) {
                *sample = logical.clone();
            }
        }
    }

    /// Parses a cluster bucket table: tab-separated, `#OTU ID` header
    /// column, one row per feature, one column per raw sample label.
    /// A duplicated feature id keeps the last row seen.
    pub fn from_buckettable(path: &Path) -> Result<Self, GnpsError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_path(path)
            .map_err(|err| GnpsError::Filesystem(format!("open {}: {err}", path.display())))?;

        let headers = reader
            .headers()
            .map_err(|err| GnpsError::MalformedRow(err.to_string()))?
            .clone();
        if headers.is_empty() || headers.get(0) != Some(OTU_ID_HEADER) {
            return Err(GnpsError::MissingColumn(OTU_ID_HEADER.to_string()));
        }
        let sample_ids: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut feature_order: Vec<String> = Vec::new();
        let mut feature_index: HashMap<String, usize> = HashMap::new();
        let mut values: Vec<Vec<f64>> = Vec::new();

        for record in reader.records() {
            let record = record.map_err(|err| GnpsError::MalformedRow(err.to_string()))?;
            let Some(feature_id) = record.get(0) else {
                continue;
            };
            let mut row = vec![0.0; sample_ids.len()];
            for (col, field) in record.iter().skip(1).enumerate() {
                if col >= row.len() {
                    return Err(GnpsError::MalformedRow(format!(
                        "feature {feature_id} has more values than sample columns"
                    )));
                }
                row[col] = parse_abundance(field, feature_id)?;
            }
            match feature_index.get(feature_id) {
                Some(&existing) => values[existing] = row,
                None => {
                    feature_index.insert(feature_id.to_string(), feature_order.len());
                    feature_order.push(feature_id.to_string());
                    values.push(row);
                }
            }
        }

        Ok(Self::new(feature_order, sample_ids, values, None))
    }

    /// Parses an MZmine2 quantification report. Each row is one feature
    /// with id, m/z and retention time, plus one `… Peak area` column per
    /// raw sample file. Raw labels are resolved through a basename-keyed
    /// mapping, which is a different key space from bucket-table columns.
    pub fn from_mzmine_report(
        path: &Path,
        basename_map: &HashMap<String, String>,
    ) -> Result<Self, GnpsError> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|err| GnpsError::Filesystem(format!("open {}: {err}", path.display())))?;

        let headers = reader
            .headers()
            .map_err(|err| GnpsError::MalformedRow(err.to_string()))?
            .clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| GnpsError::MissingColumn(name.to_string()))
        };
        let id_col = column(FEATURE_ID_COLUMN)?;
        let mz_col = column(MZ_COLUMN)?;
        let rt_col = column(RT_COLUMN)?;

        // Resolve every abundance column to its logical sample once.
        // Duplicate logical names keep their first axis position and the
        // last column's value, matching manifest resolution order.
        let mut abundance_columns: Vec<(usize, String)> = Vec::new();
        for (index, header) in headers.iter().enumerate() {
            if !header.contains(PEAK_AREA_MARKER) {
                continue;
            }
            let label = raw_sample_label(header);
            let sample = basename_map
                .get(&label)
                .ok_or_else(|| GnpsError::UnknownSampleLabel(label.clone()))?;
            abundance_columns.push((index, sample.clone()));
        }

        let mut sample_ids: Vec<String> = Vec::new();
        for (_, sample) in &abundance_columns {
            if !sample_ids.contains(sample) {
                sample_ids.push(sample.clone());
            }
        }
        let sample_index: HashMap<&String, usize> = sample_ids
            .iter()
            .enumerate()
            .map(|(index, sample)| (sample, index))
            .collect();

        let mut feature_ids = Vec::new();
        let mut values = Vec::new();
        let mut metadata = Vec::new();

        for record in reader.records() {
            let record = record.map_err(|err| GnpsError::MalformedRow(err.to_string()))?;
            let field = |index: usize, name: &str| {
                record
                    .get(index)
                    .ok_or_else(|| GnpsError::MalformedRow(format!("row without {name} value")))
            };
            let feature_id = field(id_col, FEATURE_ID_COLUMN)?.to_string();
            let mz = parse_metadata_value(field(mz_col, MZ_COLUMN)?, &feature_id, MZ_COLUMN)?;
            let retention_time =
                parse_metadata_value(field(rt_col, RT_COLUMN)?, &feature_id, RT_COLUMN)?;

            let mut row = vec![0.0; sample_ids.len()];
            for (index, sample) in &abundance_columns {
                let value = parse_abundance(field(*index, PEAK_AREA_MARKER)?, &feature_id)?;
                row[sample_index[sample]] = value;
            }

            feature_ids.push(feature_id);
            values.push(row);
            metadata.push(FeatureMetadata { mz, retention_time });
        }

        Ok(Self::new(feature_ids, sample_ids, values, Some(metadata)))
    }

    /// Writes the table back out in the bucket-table layout.
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<(), GnpsError> {
        let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(writer);
        let mut header = vec![OTU_ID_HEADER.to_string()];
        header.extend(self.sample_ids.iter().cloned());
        writer
            .write_record(&header)
            .map_err(|err| GnpsError::Filesystem(err.to_string()))?;
        for (feature_id, row) in self.feature_ids.iter().zip(&self.values) {
            let mut record = vec![feature_id.clone()];
            record.extend(row.iter().map(|value| value.to_string()));
            writer
                .write_record(&record)
                .map_err(|err| GnpsError::Filesystem(err.to_string()))?;
        }
        writer
            .flush()
            .map_err(|err| GnpsError::Filesystem(err.to_string()))
    }
}

/// Recovers the raw sample file label from an abundance column header by
/// dropping the marker, trailing whitespace, and any leading path.
fn raw_sample_label(header: &str) -> String {
    let stripped = header.replace(PEAK_AREA_MARKER, "");
    let trimmed = stripped.trim_end();
    Path::new(trimmed)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| trimmed.to_string())
}

fn parse_abundance(field: &str, feature_id: &str) -> Result<f64, GnpsError> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    trimmed.parse::<f64>().map_err(|_| {
        GnpsError::MalformedRow(format!(
            "feature {feature_id}: abundance value {trimmed:?} is not numeric"
        ))
    })
}

fn parse_metadata_value(field: &str, feature_id: &str, column: &str) -> Result<f64, GnpsError> {
    field.trim().parse::<f64>().map_err(|_| {
        GnpsError::MalformedRow(format!(
            "feature {feature_id}: {column} value {field:?} is not numeric"
        ))
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use std::io::Write as _;

    use super::*;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn buckettable_parse_and_relabel() {
        let file = write_temp("#OTU ID\tS1_raw\tS2_raw\n123\t1.5\t0\n456\t0\t2.25\n");
        let mut table = AbundanceTable::from_buckettable(file.path()).unwrap();
        assert_eq!(table.sample_ids(), ["S1_raw", "S2_raw"]);
        assert_eq!(table.feature_ids(), ["123", "456"]);

        let mapping = HashMap::from([
            ("S1_raw".to_string(), "control".to_string()),
            ("S2_raw".to_string(), "treated".to_string()),
        ]);
        table.relabel_samples(&mapping);
        assert_eq!(table.sample_ids(), ["control", "treated"]);
        assert_eq!(table.value("123", "control"), Some(1.5));
        assert_eq!(table.value("456", "treated"), Some(2.25));
    }

    #[test]
    fn buckettable_requires_otu_header() {
        let file = write_temp("feature\tS1\n1\t2\n");
        let err = AbundanceTable::from_buckettable(file.path()).unwrap_err();
        assert_matches!(err, GnpsError::MissingColumn(column) if column == "#OTU ID");
    }

    #[test]
    fn buckettable_duplicate_feature_keeps_last_row() {
        let file = write_temp("#OTU ID\tS1\n7\t1\n7\t9\n");
        let table = AbundanceTable::from_buckettable(file.path()).unwrap();
        assert_eq!(table.num_features(), 1);
        assert_eq!(table.value("7", "S1"), Some(9.0));
    }

    #[test]
    fn numeric_feature_ids_stay_strings() {
        let file = write_temp("#OTU ID\tS1\n00123\t1\n");
        let table = AbundanceTable::from_buckettable(file.path()).unwrap();
        assert_eq!(table.feature_ids(), ["00123"]);
    }

    #[test]
    fn mzmine_report_parses_metadata_and_abundances() {
        let file = write_temp(
            "row ID,row m/z,row retention time,S1_raw.mzXML Peak area,S2_raw.mzXML Peak area\n\
             123,150.5,4.2,10.0,20.0\n\
             456,300.25,8.1,0,5.5\n",
        );
        let mapping = HashMap::from([
            ("S1_raw.mzXML".to_string(), "control".to_string()),
            ("S2_raw.mzXML".to_string(), "treated".to_string()),
        ]);
        let table = AbundanceTable::from_mzmine_report(file.path(), &mapping).unwrap();
        assert_eq!(table.feature_ids(), ["123", "456"]);
        assert_eq!(table.sample_ids(), ["control", "treated"]);
        assert_eq!(table.value("123", "control"), Some(10.0));
        assert_eq!(table.value("456", "treated"), Some(5.5));
        let metadata = table.feature_metadata().unwrap();
        assert_eq!(metadata[0].mz, 150.5);
        assert_eq!(metadata[1].retention_time, 8.1);
    }

    #[test]
    fn mzmine_report_missing_required_column() {
        let file = write_temp("row ID,row m/z,S1.mzXML Peak area\n1,2.0,3\n");
        let mapping = HashMap::from([("S1.mzXML".to_string(), "s1".to_string())]);
        let err = AbundanceTable::from_mzmine_report(file.path(), &mapping).unwrap_err();
        assert_matches!(err, GnpsError::MissingColumn(column) if column == "row retention time");
    }

    #[test]
    fn mzmine_report_unknown_sample_label() {
        let file = write_temp("row ID,row m/z,row retention time,Mystery.mzXML Peak area\n1,2.0,3.0,4\n");
        let err = AbundanceTable::from_mzmine_report(file.path(), &HashMap::new()).unwrap_err();
        assert_matches!(err, GnpsError::UnknownSampleLabel(label) if label == "Mystery.mzXML");
    }

    #[test]
    fn mzmine_duplicate_logical_sample_keeps_last_value() {
        let file = write_temp(
            "row ID,row m/z,row retention time,A.mzXML Peak area,B.mzXML Peak area\n\
             1,2.0,3.0,5,8\n",
        );
        let mapping = HashMap::from([
            ("A.mzXML".to_string(), "same".to_string()),
            ("B.mzXML".to_string(), "same".to_string()),
        ]);
        let table = AbundanceTable::from_mzmine_report(file.path(), &mapping).unwrap();
        assert_eq!(table.sample_ids(), ["same"]);
        assert_eq!(table.value("1", "same"), Some(8.0));
    }

    #[test]
    fn raw_sample_label_strips_marker_and_path() {
        assert_eq!(raw_sample_label("S1_raw.mzXML Peak area"), "S1_raw.mzXML");
        assert_eq!(
            raw_sample_label("/runs/batch1/S2.mzXML Peak area"),
            "S2.mzXML"
        );
    }

    #[test]
    fn write_tsv_round_trips() {
        let table = AbundanceTable::new(
            vec!["1".to_string()],
            vec!["control".to_string()],
            vec![vec![2.5]],
            None,
        );
        let mut buffer = Vec::new();
        table.write_tsv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "#OTU ID\tcontrol\n1\t2.5\n");
    }
}
