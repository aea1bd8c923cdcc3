//! Paths from a document root to a nested node

use serde::{Serialize, Serializer};
use std::fmt;

/// A single step in a [`ValidationPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    Field(String),
    Index(usize),
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Field(name) => f.write_str(&name.replace('~', "~0").replace('/', "~1")),
            PathStep::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Ordered field-name / array-index steps from the document root.
///
/// Renders as a JSON pointer (`/processDataSet/exchanges/exchange/0`); the
/// root path renders as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ValidationPath {
    steps: Vec<PathStep>,
}

impl ValidationPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn field(&self, name: &str) -> Self {
        let mut steps = self.steps.clone();
        steps.push(PathStep::Field(name.to_string()));
        Self { steps }
    }

    pub fn index(&self, index: usize) -> Self {
        let mut steps = self.steps.clone();
        steps.push(PathStep::Index(index));
        Self { steps }
    }

    /// Parse a JSON-pointer style path. Numeric segments become array indices.
    pub fn parse(pointer: &str) -> Self {
        let steps = pointer
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.parse::<usize>() {
                Ok(index) => PathStep::Index(index),
                Err(_) => PathStep::Field(segment.replace("~1", "/").replace("~0", "~")),
            })
            .collect();
        Self { steps }
    }
}

impl FromIterator<PathStep> for ValidationPath {
    fn from_iter<I: IntoIterator<Item = PathStep>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for ValidationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "/{step}")?;
        }
        Ok(())
    }
}

impl Serialize for ValidationPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One segment of a [`PathPrefix`]
#[derive(Debug, Clone, PartialEq, Eq)]
enum PrefixSegment {
    Any,
    Literal(String),
}

/// A section prefix such as `/processDataSet/exchanges/exchange/*/referenceToFlowDataSet`.
///
/// `*` matches any single step. A numeric literal matches both an array
/// index and a field of the same name, since section tables are written
/// without knowing which one the document uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefix {
    raw: String,
    segments: Vec<PrefixSegment>,
}

impl PathPrefix {
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment {
                "*" => PrefixSegment::Any,
                literal => PrefixSegment::Literal(literal.replace("~1", "/").replace("~0", "~")),
            })
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when this prefix is an ancestor of, or equal to, `path`
    pub fn matches(&self, path: &ValidationPath) -> bool {
        if self.segments.len() > path.len() {
            return false;
        }

        self.segments
            .iter()
            .zip(path.steps())
            .all(|(segment, step)| match (segment, step) {
                (PrefixSegment::Any, _) => true,
                (PrefixSegment::Literal(literal), PathStep::Field(name)) => literal == name,
                (PrefixSegment::Literal(literal), PathStep::Index(index)) => {
                    literal.parse::<usize>().is_ok_and(|parsed| parsed == *index)
                }
            })
    }
}

impl fmt::Display for PathPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
