use std::collections::HashMap;

use chrono::NaiveDate;

use crate::{
    errors::ModelError,
    model::Trigger,
    recurrence::{shift, TimeUnit},
};

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d/%m/%Y",
];

const OFFSET_DELIMITERS: [char; 2] = ['+', '-'];

pub fn parse_literal_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

/// A date as written in the model: a literal or a trigger reference with an
/// optional signed offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateExpr {
    Literal(NaiveDate),
    Reference {
        trigger: String,
        offset: i32,
        unit: TimeUnit,
    },
}

impl DateExpr {
    pub fn parse(raw: &str, context: &str) -> Result<Self, ModelError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ModelError::invalid_date(context, raw));
        }
        if let Some(date) = parse_literal_date(trimmed) {
            return Ok(DateExpr::Literal(date));
        }
        let Some(split) = trimmed.find(OFFSET_DELIMITERS) else {
            return Ok(DateExpr::Reference {
                trigger: trimmed.to_string(),
                offset: 0,
                unit: TimeUnit::Day,
            });
        };
        let trigger = trimmed[..split].trim();
        let offset = &trimmed[split..];
        let unit_char = offset.chars().last().unwrap_or(' ');
        let unit = TimeUnit::from_suffix(unit_char)
            .ok_or_else(|| ModelError::invalid_date(context, raw))?;
        let count: i32 = offset[..offset.len() - unit_char.len_utf8()]
            .replace(' ', "")
            .parse()
            .map_err(|_| ModelError::invalid_date(context, raw))?;
        if trigger.is_empty() {
            return Err(ModelError::invalid_date(context, raw));
        }
        Ok(DateExpr::Reference {
            trigger: trigger.to_string(),
            offset: count,
            unit,
        })
    }
}

/// Resolves date expressions against the model's triggers, memoizing each
/// trigger once it has been resolved.
#[derive(Debug)]
pub struct DateResolver<'a> {
    triggers: HashMap<&'a str, &'a str>,
    resolved: HashMap<String, NaiveDate>,
}

impl<'a> DateResolver<'a> {
    pub fn new(triggers: &'a [Trigger]) -> Result<Self, ModelError> {
        let mut map = HashMap::new();
        for trigger in triggers {
            if trigger.name.contains(OFFSET_DELIMITERS) {
                return Err(ModelError::ReservedCharacter(trigger.name.clone()));
            }
            map.entry(trigger.name.as_str())
                .or_insert(trigger.date.as_str());
        }
        Ok(Self {
            triggers: map,
            resolved: HashMap::new(),
        })
    }

    pub fn resolve(&mut self, raw: &str, context: &str) -> Result<NaiveDate, ModelError> {
        let mut visited = Vec::new();
        self.resolve_expr(raw, context, &mut visited)
    }

    /// Like [`resolve`](Self::resolve) but an empty expression means "no date".
    pub fn resolve_optional(
        &mut self,
        raw: &str,
        context: &str,
    ) -> Result<Option<NaiveDate>, ModelError> {
        if raw.trim().is_empty() {
            Ok(None)
        } else {
            self.resolve(raw, context).map(Some)
        }
    }

    /// Resolves every trigger, surfacing cycles even in unused triggers.
    pub fn resolve_all(&mut self) -> Result<(), ModelError> {
        let mut names: Vec<&'a str> = self.triggers.keys().copied().collect();
        names.sort_unstable();
        for name in names {
            let mut visited = Vec::new();
            self.resolve_trigger(name, name, &mut visited)?;
        }
        Ok(())
    }

    fn resolve_expr(
        &mut self,
        raw: &str,
        context: &str,
        visited: &mut Vec<String>,
    ) -> Result<NaiveDate, ModelError> {
        match DateExpr::parse(raw, context)? {
            DateExpr::Literal(date) => Ok(date),
            DateExpr::Reference {
                trigger,
                offset,
                unit,
            } => {
                let base = self.resolve_trigger(&trigger, context, visited)?;
                shift(base, offset, unit)
                    .ok_or_else(|| ModelError::invalid_date(context, raw))
            }
        }
    }

    fn resolve_trigger(
        &mut self,
        name: &str,
        context: &str,
        visited: &mut Vec<String>,
    ) -> Result<NaiveDate, ModelError> {
        if let Some(date) = self.resolved.get(name) {
            return Ok(*date);
        }
        if visited.iter().any(|seen| seen == name) {
            return Err(ModelError::CyclicReference(name.to_string()));
        }
        let raw = *self
            .triggers
            .get(name)
            .ok_or_else(|| ModelError::unknown(context, name))?;
        visited.push(name.to_string());
        let date = self.resolve_expr(raw, name, visited)?;
        visited.pop();
        self.resolved.insert(name.to_string(), date);
        Ok(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn literal_formats() {
        assert_eq!(parse_literal_date("3 Jan 2018"), Some(date(2018, 1, 3)));
        assert_eq!(parse_literal_date("2018-01-03"), Some(date(2018, 1, 3)));
        assert_eq!(parse_literal_date("January 3 2018"), Some(date(2018, 1, 3)));
        assert_eq!(parse_literal_date("Jan 3, 2018"), Some(date(2018, 1, 3)));
        assert_eq!(parse_literal_date("03/01/2018"), Some(date(2018, 1, 3)));
        assert_eq!(parse_literal_date("nonsense"), None);
    }

    #[test]
    fn parses_offsets() {
        assert_eq!(
            DateExpr::parse("a-2d", "t").unwrap(),
            DateExpr::Reference {
                trigger: "a".into(),
                offset: -2,
                unit: TimeUnit::Day
            }
        );
        assert_eq!(
            DateExpr::parse("retire + 1y", "t").unwrap(),
            DateExpr::Reference {
                trigger: "retire".into(),
                offset: 1,
                unit: TimeUnit::Year
            }
        );
        assert!(DateExpr::parse("a+xm", "t").is_err());
        assert!(DateExpr::parse("a+1q", "t").is_err());
        assert!(DateExpr::parse("-1d", "t").is_err());
        assert!(DateExpr::parse("  ", "t").is_err());
    }

    #[test]
    fn resolves_offsets() {
        let triggers = vec![
            Trigger::new("a", "3 Jan 2018"),
            Trigger::new("b", "a-2d"),
            Trigger::new("c", "b+1m"),
            Trigger::new("d", "a-1y"),
        ];
        let mut resolver = DateResolver::new(&triggers).unwrap();
        assert_eq!(resolver.resolve("b", "t").unwrap(), date(2018, 1, 1));
        assert_eq!(resolver.resolve("c", "t").unwrap(), date(2018, 2, 1));
        assert_eq!(resolver.resolve("d", "t").unwrap(), date(2017, 1, 3));
        assert_eq!(resolver.resolve("a+1m", "t").unwrap(), date(2018, 2, 3));
    }

    #[test]
    fn detects_cycles() {
        let triggers = vec![Trigger::new("a", "b-1d"), Trigger::new("b", "a-2d")];
        let mut resolver = DateResolver::new(&triggers).unwrap();
        assert!(matches!(
            resolver.resolve("a", "t"),
            Err(ModelError::CyclicReference(_))
        ));
        assert!(matches!(
            resolver.resolve_all(),
            Err(ModelError::CyclicReference(_))
        ));
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let triggers = vec![Trigger::new("loop", "loop+1d")];
        let mut resolver = DateResolver::new(&triggers).unwrap();
        assert!(matches!(
            resolver.resolve_all(),
            Err(ModelError::CyclicReference(name)) if name == "loop"
        ));
    }

    #[test]
    fn rejects_reserved_names_and_unknown_references() {
        let triggers = vec![Trigger::new("pay-day", "1 Jan 2018")];
        assert!(matches!(
            DateResolver::new(&triggers),
            Err(ModelError::ReservedCharacter(_))
        ));

        let mut resolver = DateResolver::new(&[]).unwrap();
        assert!(matches!(
            resolver.resolve("someday", "asset x"),
            Err(ModelError::UnknownReference { .. })
        ));
        assert_eq!(resolver.resolve_optional("", "t").unwrap(), None);
    }
}
