//! Wire types for the classification service
//!
//! Every field of [`AnalysisResponse`] is optional on the wire. Missing or
//! `null` mappings and rows decode as empty, a missing or `null` censorable
//! summary decodes as zeros. Label mappings keep the order the service wrote them in, which is
//! the order legends and pie slices are drawn in.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Body of `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub comment: String,
}

/// Success body of `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub topic: String,
    pub sentiment: String,
}

/// Body of `POST /analyze`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub url: String,
    pub api_key: String,
}

/// Error body the service sends with non-2xx statuses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// Success body of `POST /analyze`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub topic_percentages: Percentages,
    #[serde(default)]
    pub sentiment_percentages: Percentages,
    #[serde(default, deserialize_with = "null_as_default")]
    pub censorable_results: CensorableResults,
    #[serde(default, deserialize_with = "null_as_default")]
    pub detailed_results: Vec<DetailedResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_comments: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CensorableResults {
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub percentage: f64,
}

/// One classified comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub comment: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub topic: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sentiment: String,
}

impl DetailedResult {
    pub fn new(comment: &str, topic: &str, sentiment: &str) -> Self {
        Self {
            comment: comment.to_string(),
            topic: topic.to_string(),
            sentiment: sentiment.to_string(),
        }
    }
}

/// `null` reads as the type's default, same as an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Label -> percentage mapping in source order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Percentages(Vec<(String, f64)>);

impl Percentages {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or overwrite a label. Overwrites keep the original position.
    pub fn insert(&mut self, label: impl Into<String>, value: f64) {
        let label = label.into();
        match self.0.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = value,
            None => self.0.push((label, value)),
        }
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(l, v)| (l.as_str(), *v))
    }

    pub fn labels(&self) -> Vec<String> {
        self.0.iter().map(|(l, _)| l.clone()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.0.iter().map(|(_, v)| *v).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Percentages {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut out = Percentages::new();
        for (label, value) in iter {
            out.insert(label, value);
        }
        out
    }
}

impl Serialize for Percentages {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, value) in &self.0 {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

struct PercentagesVisitor;

impl<'de> Visitor<'de> for PercentagesVisitor {
    type Value = Percentages;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of label to percentage")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut out = Percentages::new();
        while let Some((label, value)) = access.next_entry::<String, f64>()? {
            out.insert(label, value);
        }
        Ok(out)
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(Percentages::new())
    }
}

impl<'de> Deserialize<'de> for Percentages {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PercentagesVisitor)
    }
}
