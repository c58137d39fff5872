use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EntryError;

/// プロジェクトの識別子。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ProjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// プロジェクト。
///
/// time entryからは`ProjectId`で参照され、プロジェクト側からentryを辿ることはない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: ProjectId,
    name: String,
    /// 表示用の色。値の検証は行わない。
    pub color: String,
    pub is_active: bool,
    pub notes: Option<String>,
}

impl Project {
    /// 新しい`Project`を返す。
    ///
    /// 名前が空(空白のみを含む)の場合はエラーを返す。
    pub fn new(
        id: impl Into<ProjectId>,
        name: impl Into<String>,
        color: impl Into<String>,
    ) -> Result<Self, EntryError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(EntryError::EmptyProjectName);
        }

        Ok(Self {
            id: id.into(),
            name,
            color: color.into(),
            is_active: true,
            notes: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
