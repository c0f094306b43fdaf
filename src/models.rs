//! Resource shapes of the QuantForce API.
//!
//! These types only carry data between the service and the caller; the
//! client does not interpret datasets or binning statistics. Field names
//! follow the wire format.

use chrono::{DateTime, NaiveDateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Wire format of project timestamps (GMT).
const PROJECT_DATETIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Product family of a project.
pub mod project_type {
    pub const QUANT_DISQOVERY: i32 = 0;
    pub const QUANT_QOLLECT: i32 = 1;
}

/// An analysis workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `yyyyMMddHHmmss`, GMT.
    #[serde(default, rename = "creationDT", skip_serializing_if = "Option::is_none")]
    pub creation_dt: Option<String>,
    /// `yyyyMMddHHmmss`, GMT.
    #[serde(default, rename = "modificationDT", skip_serializing_if = "Option::is_none")]
    pub modification_dt: Option<String>,
    /// See [`project_type`].
    #[serde(default, rename = "type")]
    pub kind: i32,
    /// 0 for user data, `n` for the n-th predefined dataset.
    #[serde(default)]
    pub sub_type: i32,
    /// Base URL serving this project's API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl Project {
    /// A creation request for a user-data project.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: project_type::QUANT_DISQOVERY,
            sub_type: 0,
            ..Self::default()
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.creation_dt.as_deref().and_then(parse_project_datetime)
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modification_dt.as_deref().and_then(parse_project_datetime)
    }
}

fn parse_project_datetime(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, PROJECT_DATETIME_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectList {
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl ProjectList {
    pub fn find_by_name(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name == name)
    }
}

/// Role of a column in the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum VariableType {
    Undefined,
    Ignore,
    Continuous,
    Nominal,
    Target,
    Id,
    Weight,
}

impl From<VariableType> for u8 {
    fn from(value: VariableType) -> Self {
        match value {
            VariableType::Undefined => 1,
            VariableType::Ignore => 2,
            VariableType::Continuous => 3,
            VariableType::Nominal => 4,
            VariableType::Target => 5,
            VariableType::Id => 6,
            VariableType::Weight => 7,
        }
    }
}

impl TryFrom<u8> for VariableType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::Undefined,
            2 => Self::Ignore,
            3 => Self::Continuous,
            4 => Self::Nominal,
            5 => Self::Target,
            6 => Self::Id,
            7 => Self::Weight,
            other => return Err(format!("unknown variable type {other}")),
        })
    }
}

impl std::fmt::Display for VariableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Undefined => "Undefined",
            Self::Ignore => "Ignore",
            Self::Continuous => "Continue",
            Self::Nominal => "Nominal",
            Self::Target => "Target",
            Self::Id => "Id",
            Self::Weight => "Weight",
        };
        write!(f, "{name}")
    }
}

/// Monotonicity constraint applied when binning a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum VariableShape {
    #[default]
    Free,
    PavGrowing,
    PavDecreasing,
    UShapeConvex,
    UShapeConcave,
}

impl From<VariableShape> for u8 {
    fn from(value: VariableShape) -> Self {
        match value {
            VariableShape::Free => 0,
            VariableShape::PavGrowing => 1,
            VariableShape::PavDecreasing => 2,
            VariableShape::UShapeConvex => 3,
            VariableShape::UShapeConcave => 4,
        }
    }
}

impl TryFrom<u8> for VariableShape {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Free,
            1 => Self::PavGrowing,
            2 => Self::PavDecreasing,
            3 => Self::UShapeConvex,
            4 => Self::UShapeConcave,
            other => return Err(format!("unknown variable shape {other}")),
        })
    }
}

/// One column of an uploaded dataset.
///
/// Keys the client does not know are kept in `extra` and written back
/// unchanged, so a dataset can be fetched, edited and posted back without
/// losing server-side fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Header name in the CSV file.
    pub name: String,
    /// Free field for the user.
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(rename = "columType")]
    pub column_type: VariableType,
    #[serde(default)]
    pub shape: VariableShape,
    /// Regression hints such as `reg_forced`, `reg_llimit`, `reg_ulimit`.
    #[serde(default)]
    pub attributes: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(flatten)]
    pub extra: FxHashMap<String, serde_json::Value>,
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}", self.name, self.column_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl Dataset {
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Make `name` the only target column; any previous target is ignored.
    /// Returns `false` if no column has that name.
    pub fn set_target(&mut self, name: &str) -> bool {
        let mut found = false;
        for column in &mut self.columns {
            if column.name == name {
                column.column_type = VariableType::Target;
                found = true;
            } else if column.column_type == VariableType::Target {
                column.column_type = VariableType::Ignore;
            }
        }
        found
    }
}

/// One bin of a binned column. Statistics arrive preformatted as text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bin {
    pub id: i32,
    /// Selected for grouping.
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default)]
    pub n_bads: Option<String>,
    #[serde(default)]
    pub n_goods: Option<String>,
    #[serde(default)]
    pub n_total: Option<String>,
    #[serde(default)]
    pub bad_rate: Option<String>,
    #[serde(default)]
    pub p_total: Option<String>,
    #[serde(default)]
    pub woe: Option<String>,
    #[serde(default)]
    pub graph_optimized_mean: f64,
    #[serde(default)]
    pub graph_bad_rate: f64,
    #[serde(default)]
    pub graph_avg_bad_rate: f64,
    #[serde(default)]
    pub graph_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BinsView {
    #[serde(rename = "columnName")]
    pub column_name: String,
    #[serde(rename = "Bins", default)]
    pub bins: Vec<Bin>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BinsViewList {
    #[serde(default)]
    pub all: Vec<BinsView>,
}
