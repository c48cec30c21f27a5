//! Enums for reconciliation policy and type conversion
//!
//! # Serde Casing Conventions
//!
//! - `lowercase`: strategy keywords (ResolutionStrategy)
//! - explicit renames: conversion targets keep their short type names (`int`, `str`, ...)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy used to pick one row per duplicate key group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ResolutionStrategy {
    /// Earlier position in the source hierarchy wins
    #[default]
    Hierarchy,
    /// Higher source weight wins
    Weight,
    /// Latest `timestamp` wins
    Time,
    /// Input is returned untouched for resolution by hand
    Manual,
}

impl FromStr for ResolutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hierarchy" | "hierarchy-based" => Ok(ResolutionStrategy::Hierarchy),
            "weight" | "weight-based" | "weighted" => Ok(ResolutionStrategy::Weight),
            "time" | "time-based" | "recency" => Ok(ResolutionStrategy::Time),
            "manual" => Ok(ResolutionStrategy::Manual),
            _ => Err(format!(
                "Unknown resolution strategy: {}. Use 'hierarchy', 'weight', 'time' or 'manual'.",
                s
            )),
        }
    }
}

impl TryFrom<String> for ResolutionStrategy {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStrategy::Hierarchy => write!(f, "hierarchy"),
            ResolutionStrategy::Weight => write!(f, "weight"),
            ResolutionStrategy::Time => write!(f, "time"),
            ResolutionStrategy::Manual => write!(f, "manual"),
        }
    }
}

/// Target of a user-directed type conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    #[serde(rename = "int", alias = "integer")]
    Int,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "str", alias = "string", alias = "text")]
    Str,
    /// Parsed from `%Y-%m-%d` text
    #[serde(rename = "datetime", alias = "date")]
    Datetime,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Int => "int",
            TargetType::Float => "float",
            TargetType::Str => "str",
            TargetType::Datetime => "datetime",
        }
    }
}

impl FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "int" | "integer" => Ok(TargetType::Int),
            "float" => Ok(TargetType::Float),
            "str" | "string" | "text" => Ok(TargetType::Str),
            "datetime" | "date" => Ok(TargetType::Datetime),
            _ => Err(format!(
                "Unknown target type: {}. Use 'int', 'float', 'str' or 'datetime'.",
                s
            )),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
