//! Dataset references: opaque handles resolved into gridded series.
//!
//! The on-disk description of a dataset keeps the nested record shape used by
//! the driver configuration files:
//!
//! ```json
//! {
//!   "path + filename": ["hfls.nc", "hfss.nc"],
//!   "varname": ["hfls", "hfss"],
//!   "path + filename_area": "areacello.nc",
//!   "areaname": "areacello",
//!   "path + filename_landmask": "sftlf.nc",
//!   "landmaskname": "sftlf"
//! }
//! ```
//!
//! Path and varname may each be a string or an aligned list. The list form
//! describes a variable combined algebraically from several files; it is
//! converted once, by [`VariableEntry::source`], into a [`VariableSource`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};

/// A variable stored in one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileVariable {
    pub path: String,
    pub varname: String,
}

impl FileVariable {
    pub fn new(path: impl Into<String>, varname: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            varname: varname.into(),
        }
    }
}

/// How the components of a composite variable are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineOp {
    /// Sum of all components (e.g. net heat flux from its four terms).
    #[default]
    Sum,
    /// First component minus all following ones (e.g. down minus up).
    Difference,
}

/// Where a variable's values come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableSource {
    Simple(FileVariable),
    Composite {
        components: Vec<FileVariable>,
        combine: CombineOp,
    },
}

impl VariableSource {
    /// Every file variable that has to be read.
    pub fn components(&self) -> Vec<&FileVariable> {
        match self {
            VariableSource::Simple(fv) => vec![fv],
            VariableSource::Composite { components, .. } => components.iter().collect(),
        }
    }
}

/// A string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn to_vec(&self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s.clone()],
            OneOrMany::Many(v) => v.clone(),
        }
    }
}

/// Per-variable record of a dataset, in the driver configuration shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableEntry {
    #[serde(rename = "path + filename")]
    pub path: OneOrMany,

    pub varname: OneOrMany,

    #[serde(rename = "path + filename_area", default, skip_serializing_if = "Option::is_none")]
    pub area_path: Option<String>,

    #[serde(rename = "areaname", default, skip_serializing_if = "Option::is_none")]
    pub area_name: Option<String>,

    #[serde(rename = "path + filename_landmask", default, skip_serializing_if = "Option::is_none")]
    pub landmask_path: Option<String>,

    #[serde(rename = "landmaskname", default, skip_serializing_if = "Option::is_none")]
    pub landmask_name: Option<String>,

    /// Operator for list-valued entries.
    #[serde(default)]
    pub combine: CombineOp,
}

impl VariableEntry {
    /// Entry for a variable read from a single file.
    pub fn simple(path: impl Into<String>, varname: impl Into<String>) -> Self {
        Self {
            path: OneOrMany::One(path.into()),
            varname: OneOrMany::One(varname.into()),
            area_path: None,
            area_name: None,
            landmask_path: None,
            landmask_name: None,
            combine: CombineOp::Sum,
        }
    }

    /// Entry for a variable combined from several files.
    pub fn composite<P, V>(paths: P, varnames: V, combine: CombineOp) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            path: OneOrMany::Many(paths.into_iter().map(Into::into).collect()),
            varname: OneOrMany::Many(varnames.into_iter().map(Into::into).collect()),
            area_path: None,
            area_name: None,
            landmask_path: None,
            landmask_name: None,
            combine,
        }
    }

    /// Attach an area-cell reference.
    pub fn with_area(mut self, path: impl Into<String>, name: impl Into<String>) -> Self {
        self.area_path = Some(path.into());
        self.area_name = Some(name.into());
        self
    }

    /// Attach a land-mask reference.
    pub fn with_landmask(mut self, path: impl Into<String>, name: impl Into<String>) -> Self {
        self.landmask_path = Some(path.into());
        self.landmask_name = Some(name.into());
        self
    }

    /// Convert to a [`VariableSource`].
    ///
    /// A single path with several varnames reads every varname from that file.
    /// Otherwise path and varname lists must be aligned.
    pub fn source(&self) -> EngineResult<VariableSource> {
        let paths = self.path.to_vec();
        let varnames = self.varname.to_vec();

        if paths.is_empty() || varnames.is_empty() {
            return Err(EngineError::ConfigError(
                "dataset entry needs at least one path and one varname".into(),
            ));
        }

        let paths = if paths.len() == 1 && varnames.len() > 1 {
            vec![paths[0].clone(); varnames.len()]
        } else {
            paths
        };

        if paths.len() != varnames.len() {
            return Err(EngineError::ConfigError(format!(
                "dataset entry has {} paths but {} varnames",
                paths.len(),
                varnames.len()
            )));
        }

        let mut components: Vec<FileVariable> = paths
            .into_iter()
            .zip(varnames)
            .map(|(p, v)| FileVariable::new(p, v))
            .collect();

        if components.len() == 1 {
            Ok(VariableSource::Simple(components.remove(0)))
        } else {
            Ok(VariableSource::Composite {
                components,
                combine: self.combine,
            })
        }
    }
}

/// A named data source: the model or one observational dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRef {
    pub name: String,
    /// Variable name (as used by metric specs) to its file record.
    #[serde(default)]
    pub variables: BTreeMap<String, VariableEntry>,
}

impl DatasetRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: BTreeMap::new(),
        }
    }

    /// Add or replace a variable record.
    pub fn with_variable(mut self, variable: impl Into<String>, entry: VariableEntry) -> Self {
        self.variables.insert(variable.into(), entry);
        self
    }

    pub fn entry(&self, variable: &str) -> Option<&VariableEntry> {
        self.variables.get(variable)
    }

    pub fn provides(&self, variable: &str) -> bool {
        self.variables.contains_key(variable)
    }

    /// Check that every variable record converts to a [`VariableSource`].
    pub fn validate(&self) -> EngineResult<()> {
        for (variable, entry) in &self.variables {
            if let Err(err) = entry.source() {
                return Err(match err {
                    EngineError::ConfigError(msg) => EngineError::ConfigError(format!(
                        "dataset '{}', variable '{}': {}",
                        self.name, variable, msg
                    )),
                    other => other,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_entry_source() {
        let entry = VariableEntry::simple("tos.nc", "tos");
        assert_eq!(
            entry.source().unwrap(),
            VariableSource::Simple(FileVariable::new("tos.nc", "tos"))
        );
    }

    #[test]
    fn test_composite_entry_source() {
        let entry = VariableEntry::composite(["rlds.nc", "rlus.nc"], ["rlds", "rlus"], CombineOp::Difference);
        match entry.source().unwrap() {
            VariableSource::Composite { components, combine } => {
                assert_eq!(components.len(), 2);
                assert_eq!(components[1].varname, "rlus");
                assert_eq!(combine, CombineOp::Difference);
            }
            other => panic!("expected composite, got {:?}", other),
        }
    }

    #[test]
    fn test_single_path_many_varnames() {
        let entry = VariableEntry::composite(["fluxes.nc"], ["hfls", "hfss"], CombineOp::Sum);
        let source = entry.source().unwrap();
        let comps = source.components();
        assert_eq!(comps.len(), 2);
        assert!(comps.iter().all(|c| c.path == "fluxes.nc"));
    }

    #[test]
    fn test_misaligned_lists_rejected() {
        let entry = VariableEntry::composite(["a.nc", "b.nc", "c.nc"], ["a", "b"], CombineOp::Sum);
        let err = entry.source().unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("3 paths but 2 varnames"));
    }

    #[test]
    fn test_deserialize_driver_shape() {
        let json = r#"{
            "path + filename": ["hfls.nc", "hfss.nc", "rlds.nc", "rlus.nc"],
            "varname": ["hfls", "hfss", "rlds", "rlus"],
            "path + filename_area": "areacello.nc",
            "areaname": "areacello",
            "path + filename_landmask": "sftlf.nc",
            "landmaskname": "sftlf"
        }"#;
        let entry: VariableEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.area_name.as_deref(), Some("areacello"));
        assert_eq!(entry.landmask_path.as_deref(), Some("sftlf.nc"));
        assert_eq!(entry.combine, CombineOp::Sum);
        assert_eq!(entry.source().unwrap().components().len(), 4);
    }

    #[test]
    fn test_dataset_ref_provides() {
        let ds = DatasetRef::new("HadISST").with_variable("sst", VariableEntry::simple("hadisst.nc", "sst"));
        assert!(ds.provides("sst"));
        assert!(!ds.provides("taux"));
        assert!(ds.entry("sst").is_some());
    }

    #[test]
    fn test_dataset_validate_names_the_record() {
        let ds = DatasetRef::new("CERES")
            .with_variable("sst", VariableEntry::simple("tos.nc", "tos"))
            .with_variable("thf", VariableEntry::composite(["a.nc", "b.nc", "c.nc"], ["a", "b"], CombineOp::Sum));
        let err = ds.validate().unwrap_err();
        assert!(matches!(err, EngineError::ConfigError(_)));
        assert_eq!(
            err.to_string(),
            "Configuration error: dataset 'CERES', variable 'thf': dataset entry has 3 paths but 2 varnames"
        );
        assert!(DatasetRef::new("HadISST")
            .with_variable("sst", VariableEntry::simple("hadisst.nc", "sst"))
            .validate()
            .is_ok());
    }
}
