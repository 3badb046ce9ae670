use std::collections::{HashMap, HashSet};

use crate::{errors::ModelError, model::Setting};

/// Parses a plain number. A trailing `%` divides by 100.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let (digits, scale) = match trimmed.strip_suffix('%') {
        Some(stripped) => (stripped.trim_end(), 0.01),
        None => (trimmed, 1.0),
    };
    digits
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| value * scale)
}

/// A value as written in the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueExpr {
    Number(f64),
    /// `coefficient` times the current value of a setting or asset.
    Reference { coefficient: f64, name: String },
}

impl ValueExpr {
    pub fn parse(raw: &str, context: &str) -> Result<Self, ModelError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ModelError::invalid_value(context, raw));
        }
        if let Some(number) = parse_number(trimmed) {
            return Ok(ValueExpr::Number(number));
        }

        let (prefix, rest) = split_coefficient(trimmed);
        let coefficient = match prefix {
            "" | "+" => 1.0,
            "-" => -1.0,
            digits => digits
                .parse::<f64>()
                .map_err(|_| ModelError::invalid_value(context, raw))?,
        };
        let rest = rest.trim_start();
        let name = rest.strip_prefix('*').unwrap_or(rest).trim();
        let starts_like_number = name
            .chars()
            .next()
            .map_or(true, |first| first.is_ascii_digit() || first == '.');
        if starts_like_number {
            return Err(ModelError::invalid_value(context, raw));
        }
        Ok(ValueExpr::Reference {
            coefficient,
            name: name.to_string(),
        })
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ValueExpr::Number(value) => Some(*value),
            ValueExpr::Reference { .. } => None,
        }
    }

    pub fn reference(&self) -> Option<&str> {
        match self {
            ValueExpr::Number(_) => None,
            ValueExpr::Reference { name, .. } => Some(name),
        }
    }

    /// Evaluates against current values; `None` when the name is unknown.
    pub fn evaluate<F>(&self, lookup: F) -> Option<f64>
    where
        F: Fn(&str) -> Option<f64>,
    {
        match self {
            ValueExpr::Number(value) => Some(*value),
            ValueExpr::Reference { coefficient, name } => {
                lookup(name).map(|value| coefficient * value)
            }
        }
    }
}

fn split_coefficient(raw: &str) -> (&str, &str) {
    let bytes = raw.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'-' | b'+')));
    let mut seen_dot = false;
    while let Some(byte) = bytes.get(end) {
        match byte {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    raw.split_at(end)
}

/// Numeric values of the model's settings at the start of a run. Settings
/// that do not evaluate to a number (dates, labels) are kept as text.
#[derive(Debug, Clone, Default)]
pub struct SettingValues {
    numeric: HashMap<String, f64>,
    text: HashSet<String>,
}

impl SettingValues {
    pub fn resolve(settings: &[Setting]) -> Result<Self, ModelError> {
        let mut by_name: HashMap<&str, &str> = HashMap::new();
        for setting in settings {
            by_name
                .entry(setting.name.as_str())
                .or_insert(setting.value.as_str());
        }

        let mut values = SettingValues::default();
        for setting in settings {
            let mut visited = Vec::new();
            values.evaluate(&setting.name, &by_name, &mut visited)?;
        }
        Ok(values)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.numeric.get(name).copied()
    }

    pub fn is_text(&self, name: &str) -> bool {
        self.text.contains(name)
    }

    pub fn into_numeric(self) -> HashMap<String, f64> {
        self.numeric
    }

    fn evaluate(
        &mut self,
        name: &str,
        by_name: &HashMap<&str, &str>,
        visited: &mut Vec<String>,
    ) -> Result<Option<f64>, ModelError> {
        if let Some(value) = self.numeric.get(name) {
            return Ok(Some(*value));
        }
        if self.text.contains(name) {
            return Ok(None);
        }
        if visited.iter().any(|seen| seen == name) {
            return Err(ModelError::CyclicReference(name.to_string()));
        }
        let Some(raw) = by_name.get(name) else {
            return Ok(None);
        };

        visited.push(name.to_string());
        let value = match ValueExpr::parse(raw, name) {
            Ok(ValueExpr::Number(number)) => Some(number),
            Ok(ValueExpr::Reference { coefficient, name: target }) => {
                if by_name.contains_key(target.as_str()) {
                    self.evaluate(&target, by_name, visited)?
                        .map(|value| coefficient * value)
                } else {
                    None
                }
            }
            Err(_) => None,
        };
        visited.pop();

        match value {
            Some(number) => {
                self.numeric.insert(name.to_string(), number);
            }
            None => {
                self.text.insert(name.to_string());
            }
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_and_percentages() {
        assert_eq!(ValueExpr::parse("500", "t").unwrap(), ValueExpr::Number(500.0));
        assert_eq!(ValueExpr::parse("-2.5", "t").unwrap(), ValueExpr::Number(-2.5));
        let half = ValueExpr::parse("50%", "t").unwrap().as_number().unwrap();
        assert!((half - 0.5).abs() < f64::EPSILON);
        assert!(ValueExpr::parse("", "t").is_err());
        assert!(ValueExpr::parse("1.2.3", "t").is_err());
        assert!(ValueExpr::parse("12*", "t").is_err());
    }

    #[test]
    fn parses_scaled_references() {
        assert_eq!(
            ValueExpr::parse("2stockPrice", "t").unwrap(),
            ValueExpr::Reference {
                coefficient: 2.0,
                name: "stockPrice".into()
            }
        );
        assert_eq!(
            ValueExpr::parse("0.5 * savings", "t").unwrap(),
            ValueExpr::Reference {
                coefficient: 0.5,
                name: "savings".into()
            }
        );
        let bare = ValueExpr::parse("cpi", "t").unwrap();
        assert_eq!(bare.reference(), Some("cpi"));
        assert_eq!(bare.as_number(), None);
    }

    #[test]
    fn evaluates_against_lookup() {
        let expr = ValueExpr::parse("10x", "t").unwrap();
        let lookup = |name: &str| (name == "x").then_some(3.0);
        assert_eq!(expr.evaluate(lookup), Some(30.0));
        let missing = ValueExpr::parse("y", "t").unwrap();
        assert_eq!(missing.evaluate(lookup), None);
    }

    #[test]
    fn resolves_setting_chains_and_text() {
        let settings = vec![
            Setting::new("base", "100"),
            Setting::new("double", "2base"),
            Setting::new("start", "1 Dec 2017"),
            Setting::new("label", "Retired"),
        ];
        let values = SettingValues::resolve(&settings).unwrap();
        assert_eq!(values.get("double"), Some(200.0));
        assert!(values.is_text("start"));
        assert!(values.is_text("label"));
        assert_eq!(values.get("label"), None);
    }

    #[test]
    fn cyclic_settings_are_fatal() {
        let settings = vec![Setting::new("a", "2b"), Setting::new("b", "a")];
        assert!(matches!(
            SettingValues::resolve(&settings),
            Err(ModelError::CyclicReference(_))
        ));
    }
}
