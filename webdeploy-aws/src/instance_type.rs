//! EC2 instance type parsing
//!
//! An instance type string is a `class.size` pair such as `t3.small`. The
//! class and size are kept apart because the fleet definition takes them as
//! two separate values.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

/// Instance family + generation (+ attributes), e.g. `t3`, `m6gd`, `u-6tb1`
static CLASS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]*[0-9][a-z0-9-]*$").expect("valid regex"));

/// Size within a class, e.g. `nano`, `xlarge`, `24xlarge`, `metal-48xl`
static SIZE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(nano|micro|small|medium|large|xlarge|[0-9]+xlarge|metal(-[0-9]+xl)?)$")
        .expect("valid regex")
});

/// Errors raised while parsing an instance type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InstanceTypeError {
    #[error("Invalid instance type '{0}': expected <class>.<size>, e.g. t3.small")]
    Malformed(String),

    #[error("Invalid instance class '{class}' in instance type '{value}'")]
    InvalidClass { value: String, class: String },

    #[error("Invalid instance size '{size}' in instance type '{value}'")]
    InvalidSize { value: String, size: String },
}

/// A parsed EC2 instance type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceType {
    class: String,
    size: String,
}

impl InstanceType {
    pub fn parse(s: &str) -> Result<Self, InstanceTypeError> {
        let (class, size) = s
            .split_once('.')
            .ok_or_else(|| InstanceTypeError::Malformed(s.to_string()))?;
        if size.contains('.') {
            return Err(InstanceTypeError::Malformed(s.to_string()));
        }
        if !CLASS_PATTERN.is_match(class) {
            return Err(InstanceTypeError::InvalidClass {
                value: s.to_string(),
                class: class.to_string(),
            });
        }
        if !SIZE_PATTERN.is_match(size) {
            return Err(InstanceTypeError::InvalidSize {
                value: s.to_string(),
                size: size.to_string(),
            });
        }
        Ok(Self {
            class: class.to_string(),
            size: size.to_string(),
        })
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn size(&self) -> &str {
        &self.size
    }
}

impl FromStr for InstanceType {
    type Err = InstanceTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.size)
    }
}
