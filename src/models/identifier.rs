//! 标识符
//!
//! 题目 / 表单的不透明 ID。相等性约定：去掉首尾空白、ASCII 小写化之后的
//! 规范字符串相等即视为同一个 ID（与存储端 ObjectId 的十六进制大小写无关）。

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

static ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_\-]{1,64}$").expect("ID 正则非法"));

/// 不透明唯一标识符
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// 解析并规范化一个 ID，格式非法时返回 None
    pub fn parse(raw: &str) -> Option<Self> {
        let canonical = raw.trim().to_ascii_lowercase();
        if ID_PATTERN.is_match(&canonical) {
            Some(Self(canonical))
        } else {
            None
        }
    }

    /// 生成一个新的 ID
    pub fn generate() -> Self {
        Self(Ulid::new().to_string().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("非法的ID: '{}'", s))
    }
}

impl TryFrom<String> for Identifier {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}
