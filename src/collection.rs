use chrono::{DateTime, NaiveDate};

use crate::{Corpus, Error, Note, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextOp {
    Contains,
    Equals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateOp {
    Before,
    After,
}

/// A single smart-collection filter. Only meaningful field/operator pairs
/// can be expressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RuleSpec", into = "RuleSpec")]
pub enum Rule {
    /// Matched against tag names.
    Tag(TextOp, String),
    /// Matched against the folder path from the root.
    Folder(TextOp, String),
    Content(TextOp, String),
    /// Compared by UTC calendar date; time of day is ignored.
    CreatedAt(DateOp, NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleField {
    Tag,
    Folder,
    Content,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleOperator {
    Contains,
    Equals,
    Before,
    After,
}

/// Loose `{ field, operator, value }` form as stored by the host application.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RuleSpec {
    pub field: RuleField,
    pub operator: RuleOperator,
    pub value: String,
}

impl TryFrom<RuleSpec> for Rule {
    type Error = Error;

    fn try_from(raw: RuleSpec) -> Result<Self> {
        let text_op = match raw.operator {
            RuleOperator::Contains => Some(TextOp::Contains),
            RuleOperator::Equals => Some(TextOp::Equals),
            _ => None,
        };
        let date_op = match raw.operator {
            RuleOperator::Before => Some(DateOp::Before),
            RuleOperator::After => Some(DateOp::After),
            _ => None,
        };

        let rule = match (raw.field, text_op, date_op) {
            (RuleField::Tag, Some(op), _) => Rule::Tag(op, raw.value),
            (RuleField::Folder, Some(op), _) => Rule::Folder(op, raw.value),
            (RuleField::Content, Some(op), _) => Rule::Content(op, raw.value),
            (RuleField::CreatedAt, _, Some(op)) => Rule::CreatedAt(op, parse_rule_date(&raw.value)?),
            (field, _, _) => {
                return Err(Error::InvalidRule {
                    field: format!("{field:?}"),
                    operator: format!("{:?}", raw.operator),
                });
            }
        };
        Ok(rule)
    }
}

impl From<Rule> for RuleSpec {
    fn from(rule: Rule) -> Self {
        let text = |field: RuleField, op: TextOp, value: String| RuleSpec {
            field,
            operator: match op {
                TextOp::Contains => RuleOperator::Contains,
                TextOp::Equals => RuleOperator::Equals,
            },
            value,
        };
        match rule {
            Rule::Tag(op, v) => text(RuleField::Tag, op, v),
            Rule::Folder(op, v) => text(RuleField::Folder, op, v),
            Rule::Content(op, v) => text(RuleField::Content, op, v),
            Rule::CreatedAt(op, date) => RuleSpec {
                field: RuleField::CreatedAt,
                operator: match op {
                    DateOp::Before => RuleOperator::Before,
                    DateOp::After => RuleOperator::After,
                },
                value: date.format("%Y-%m-%d").to_string(),
            },
        }
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (its UTC date is used).
fn parse_rule_date(value: &str) -> Result<NaiveDate> {
    let v = value.trim();
    if let Ok(d) = NaiveDate::parse_from_str(v, "%Y-%m-%d") {
        return Ok(d);
    }
    DateTime::parse_from_rfc3339(v)
        .map(|dt| dt.naive_utc().date())
        .map_err(|_| Error::InvalidDate(value.to_string()))
}

impl Rule {
    pub fn matches(&self, note: &Note, corpus: &Corpus) -> bool {
        match self {
            Rule::Tag(op, value) => {
                let needle = value.to_lowercase();
                corpus
                    .tag_names(note)
                    .any(|name| text_matches(*op, &name.to_lowercase(), &needle))
            }
            Rule::Folder(op, value) => {
                let Some(path) = note.folder.as_ref().and_then(|f| corpus.folder_path(f)) else {
                    return false;
                };
                text_matches(*op, &path.to_lowercase(), &value.to_lowercase())
            }
            Rule::Content(op, value) => {
                text_matches(*op, &note.body.to_lowercase(), &value.to_lowercase())
            }
            Rule::CreatedAt(op, date) => {
                let created = note.created_at.date_naive();
                match op {
                    DateOp::Before => created < *date,
                    DateOp::After => created > *date,
                }
            }
        }
    }
}

fn text_matches(op: TextOp, haystack: &str, needle: &str) -> bool {
    match op {
        TextOp::Contains => haystack.contains(needle),
        TextOp::Equals => haystack == needle,
    }
}

/// Named rule list combined with AND. Membership is computed on demand and
/// never stored.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SmartCollection {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl SmartCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// A collection without rules is unconfigured and matches nothing.
    pub fn is_configured(&self) -> bool {
        !self.rules.is_empty()
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }
}

/// Notes matching every rule of `collection`, in corpus order.
pub fn evaluate_collection<'a>(collection: &SmartCollection, corpus: &'a Corpus) -> Vec<&'a Note> {
    if !collection.is_configured() {
        return Vec::new();
    }
    corpus
        .notes()
        .iter()
        .filter(|note| collection.rules.iter().all(|r| r.matches(note, corpus)))
        .collect()
}
