use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One county row of the education dataset.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EducationRecord {
    pub fips: u32,
    pub state: String,
    pub area_name: String,
    #[serde(rename = "bachelorsOrHigher")]
    pub bachelors_or_higher: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EducationEntry {
    pub area_name: String,
    pub state: String,
    pub bachelors_or_higher: f64,
}

/// Lookup from fips to the county's education figures.
#[derive(Debug, Clone, Default)]
pub struct EducationIndex {
    entries: HashMap<u32, EducationEntry>,
}

impl EducationIndex {
    /// Later records overwrite earlier ones sharing a fips.
    pub fn from_records(records: &[EducationRecord]) -> Self {
        let entries = records
            .iter()
            .map(|r| {
                (
                    r.fips,
                    EducationEntry {
                        area_name: r.area_name.clone(),
                        state: r.state.clone(),
                        bachelors_or_higher: r.bachelors_or_higher,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, fips: u32) -> Option<&EducationEntry> {
        self.entries.get(&fips)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Pointer position in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Pointer {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TooltipState {
    pub visible: bool,
    pub content: String,
    pub x: f64,
    pub y: f64,
}
