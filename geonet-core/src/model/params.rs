//! Analysis parameters
//!
//! Free-form tags coming from a transport are resolved once into closed
//! enumerations here; everything past this module works with the enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Node metric computed by the metric engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AnalysisType {
    /// Node degree
    Connectivity,
    /// Closeness centrality, optionally radius-bounded
    Closeness,
    /// Betweenness centrality (Brandes)
    Betweenness,
}

impl AnalysisType {
    /// Attribute name under which the metric is written to output features
    pub fn column_name(self) -> &'static str {
        match self {
            AnalysisType::Connectivity => "connectivity",
            AnalysisType::Closeness => "closeness",
            AnalysisType::Betweenness => "betweenness",
        }
    }
}

impl FromStr for AnalysisType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "connectivity" | "degree" => Ok(AnalysisType::Connectivity),
            "closeness" => Ok(AnalysisType::Closeness),
            "betweenness" => Ok(AnalysisType::Betweenness),
            _ => Err(Error::UnknownAnalysisType(s.to_string())),
        }
    }
}

/// Binning method used by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ClassificationMethod {
    /// Fisher-Jenks optimal partition
    #[default]
    NaturalBreaks,
    EqualInterval,
    Quantile,
}

impl FromStr for ClassificationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "naturalbreaksjenks" | "naturalbreaks" | "jenks" | "fisherjenks" => {
                Ok(ClassificationMethod::NaturalBreaks)
            }
            "equalinterval" => Ok(ClassificationMethod::EqualInterval),
            "quantile" | "quantiles" | "equalcountquantile" | "equalcount" => {
                Ok(ClassificationMethod::Quantile)
            }
            _ => Err(Error::UnsupportedClassificationMethod(s.to_string())),
        }
    }
}

/// Edge cost used by shortest-path metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WeightMode {
    /// Edge cost is its euclidean length in metres
    #[default]
    Euclidean,
    /// Every edge costs one hop. Angular and hybrid requests land here too,
    /// turn angles are not modelled.
    Topological,
}

impl FromStr for WeightMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euclidean" | "length" | "metric" => Ok(WeightMode::Euclidean),
            "topological" | "angular" | "hybrid" => Ok(WeightMode::Topological),
            _ => Err(Error::UnknownWeightMode(s.to_string())),
        }
    }
}

macro_rules! string_conversions {
    ($($ty:ty => [$($variant:path => $label:literal),+ $(,)?]),+ $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    let label = match self {
                        $($variant => $label,)+
                    };
                    f.write_str(label)
                }
            }

            impl TryFrom<String> for $ty {
                type Error = Error;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    value.parse()
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> Self {
                    value.to_string()
                }
            }
        )+
    };
}

string_conversions! {
    AnalysisType => [
        AnalysisType::Connectivity => "connectivity",
        AnalysisType::Closeness => "closeness",
        AnalysisType::Betweenness => "betweenness",
    ],
    ClassificationMethod => [
        ClassificationMethod::NaturalBreaks => "natural_breaks",
        ClassificationMethod::EqualInterval => "equal_interval",
        ClassificationMethod::Quantile => "quantile",
    ],
    WeightMode => [
        WeightMode::Euclidean => "euclidean",
        WeightMode::Topological => "topological",
    ],
}

/// Parses a search radius. `n` (any case) or an empty string means global.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] for anything that is neither `n` nor a
/// positive finite number.
pub fn parse_radius(value: &str) -> Result<Option<f64>, Error> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("n") {
        return Ok(None);
    }

    let radius: f64 = value
        .parse()
        .map_err(|_| Error::InvalidParameter(format!("radius must be a number or 'n', got '{value}'")))?;
    validate_radius(radius).map(Some)
}

fn validate_radius(radius: f64) -> Result<f64, Error> {
    if radius.is_finite() && radius > 0.0 {
        Ok(radius)
    } else {
        Err(Error::InvalidParameter(format!(
            "radius must be positive and finite, got {radius}"
        )))
    }
}

/// Largest number of display classes a request may ask for
pub const MAX_CLASS_COUNT: usize = 32;

/// Full parameter set of one analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    pub analysis_type: AnalysisType,
    #[serde(default)]
    pub classification_method: ClassificationMethod,
    #[serde(default = "default_class_count")]
    pub class_count: usize,
    #[serde(default)]
    pub weight_mode: WeightMode,
    #[serde(default)]
    pub radius: Option<f64>,
}

fn default_class_count() -> usize {
    5
}

impl AnalysisParams {
    pub fn new(analysis_type: AnalysisType) -> Self {
        Self {
            analysis_type,
            classification_method: ClassificationMethod::default(),
            class_count: default_class_count(),
            weight_mode: WeightMode::default(),
            radius: None,
        }
    }

    /// Checks numeric parameters that the type system does not cover
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] when `class_count` is outside
    /// `1..=MAX_CLASS_COUNT` or the radius is not positive and finite.
    pub fn validate(&self) -> Result<(), Error> {
        if !(1..=MAX_CLASS_COUNT).contains(&self.class_count) {
            return Err(Error::InvalidParameter(format!(
                "class_count must be between 1 and {MAX_CLASS_COUNT}, got {}",
                self.class_count
            )));
        }
        if let Some(radius) = self.radius {
            validate_radius(radius)?;
        }
        Ok(())
    }
}
