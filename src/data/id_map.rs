//! External document id → internal document index
//!
//! Built once from a CSV file of `external_id,document_index` rows and passed
//! into the query path; lookups never touch the file again.

use crate::error::{LdaError, Result};
use csv::ReaderBuilder;
use hashbrown::HashMap;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct IdMap {
    map: HashMap<u64, usize>,
}

impl IdMap {
    /// Load the map from a CSV file. A first row with neither column
    /// numeric is treated as a header and skipped.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut map = HashMap::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let line = row + 1;
            let id_field = record
                .get(0)
                .ok_or_else(|| LdaError::parse(line, "missing external id"))?;

            let external_id = match id_field.parse::<u64>() {
                Ok(id) => id,
                Err(_) if row == 0 && is_header(&record) => continue,
                Err(_) => {
                    return Err(LdaError::parse(
                        line,
                        format!("invalid external id '{}'", id_field),
                    ))
                }
            };
            let index = record
                .get(1)
                .ok_or_else(|| LdaError::parse(line, "missing document index"))?
                .parse::<usize>()
                .map_err(|_| LdaError::parse(line, "invalid document index"))?;

            map.insert(external_id, index);
        }

        Ok(Self { map })
    }

    /// Internal document index for `external_id`
    pub fn resolve(&self, external_id: u64) -> Option<usize> {
        self.map.get(&external_id).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Both fields present and neither parses as a number
fn is_header(record: &csv::StringRecord) -> bool {
    match (record.get(0), record.get(1)) {
        (Some(id), Some(index)) => id.parse::<u64>().is_err() && index.parse::<usize>().is_err(),
        _ => false,
    }
}

impl FromIterator<(u64, usize)> for IdMap {
    fn from_iter<I: IntoIterator<Item = (u64, usize)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}
