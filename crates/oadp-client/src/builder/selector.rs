//! Label selectors in the `kubectl` string syntax.

use std::{collections::BTreeMap, fmt, str::FromStr};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use snafu::{Snafu, ensure};

type Result<T, E = SelectorError> = std::result::Result<T, E>;

/// Separates the alternatives of an `--or-selector`.
const OR_SEPARATOR: &str = " or ";

#[derive(Debug, PartialEq, Snafu)]
pub enum SelectorError {
    #[snafu(display("label selector is empty"))]
    EmptySelector,

    #[snafu(display("invalid label selector requirement {requirement:?}"))]
    InvalidRequirement { requirement: String },

    #[snafu(display("unbalanced parentheses in label selector {selector:?}"))]
    UnbalancedParentheses { selector: String },

    #[snafu(display("label selector with binary operator {operator:?} must have values"))]
    BinaryOperatorWithoutValues { operator: String },

    #[snafu(display("label selector with unary operator {operator:?} must not have values"))]
    UnaryOperatorWithValues { operator: String },

    #[snafu(display("label selector has an invalid operator {operator:?}"))]
    InvalidOperator { operator: String },
}

/// Extends [`LabelSelector`] with the conversion into its query string form.
pub trait LabelSelectorExt {
    /// Renders the selector the way it is passed to the Kubernetes API and
    /// accepted by `--selector`.
    fn to_query_string(&self) -> Result<String>;
}

impl LabelSelectorExt for LabelSelector {
    fn to_query_string(&self) -> Result<String> {
        let mut parts: Vec<String> = self
            .match_labels
            .iter()
            .flatten()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();

        for requirement in self.match_expressions.iter().flatten() {
            let values = requirement.values.as_deref().unwrap_or_default();
            let part = match requirement.operator.as_str() {
                operator @ ("In" | "NotIn") => {
                    ensure!(!values.is_empty(), BinaryOperatorWithoutValuesSnafu { operator });
                    format!(
                        "{key} {operator} ({values})",
                        key = requirement.key,
                        operator = operator.to_ascii_lowercase(),
                        values = values.join(", ")
                    )
                }
                operator @ "Exists" => {
                    ensure!(values.is_empty(), UnaryOperatorWithValuesSnafu { operator });
                    requirement.key.clone()
                }
                operator @ "DoesNotExist" => {
                    ensure!(values.is_empty(), UnaryOperatorWithValuesSnafu { operator });
                    format!("!{key}", key = requirement.key)
                }
                operator => return InvalidOperatorSnafu { operator }.fail(),
            };
            parts.push(part);
        }

        Ok(parts.join(","))
    }
}

/// Renders an optional selector for display, `<none>` if it is unset.
pub fn display_selector(selector: Option<&LabelSelector>) -> String {
    selector
        .and_then(|selector| selector.to_query_string().ok())
        .filter(|query| !query.is_empty())
        .unwrap_or_else(|| "<none>".to_owned())
}

/// A label selector given on the command line, like `app=nginx,tier!=cache`.
#[derive(Clone, Debug, PartialEq)]
pub struct Selector(pub LabelSelector);

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(input: &str) -> Result<Self> {
        let mut match_labels = BTreeMap::new();
        let mut match_expressions = Vec::new();

        for requirement in split_requirements(input)? {
            match parse_requirement(requirement)? {
                Requirement::Equals(key, value) => {
                    match_labels.insert(key, value);
                }
                Requirement::Expression(expression) => match_expressions.push(expression),
            }
        }

        ensure!(
            !match_labels.is_empty() || !match_expressions.is_empty(),
            EmptySelectorSnafu
        );

        Ok(Self(LabelSelector {
            match_labels: (!match_labels.is_empty()).then_some(match_labels),
            match_expressions: (!match_expressions.is_empty()).then_some(match_expressions),
        }))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let query = self.0.to_query_string().map_err(|_| fmt::Error)?;
        f.write_str(&query)
    }
}

/// Alternatives of label selectors, like `app=nginx or app=redis`. An object
/// matches if it matches any of them.
#[derive(Clone, Debug, PartialEq)]
pub struct OrSelector(pub Vec<LabelSelector>);

impl FromStr for OrSelector {
    type Err = SelectorError;

    fn from_str(input: &str) -> Result<Self> {
        input
            .split(OR_SEPARATOR)
            .map(|alternative| alternative.parse().map(|Selector(selector)| selector))
            .collect::<Result<_>>()
            .map(Self)
    }
}

enum Requirement {
    Equals(String, String),
    Expression(LabelSelectorRequirement),
}

/// Splits on the commas that are not inside a value list.
fn split_requirements(input: &str) -> Result<Vec<&str>> {
    let mut requirements = Vec::new();
    let mut depth = 0_usize;
    let mut start = 0;

    for (index, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1).ok_or_else(|| SelectorError::UnbalancedParentheses {
                    selector: input.to_owned(),
                })?;
            }
            ',' if depth == 0 => {
                requirements.push(input[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    ensure!(depth == 0, UnbalancedParenthesesSnafu { selector: input });
    requirements.push(input[start..].trim());

    Ok(requirements
        .into_iter()
        .filter(|requirement| !requirement.is_empty())
        .collect())
}

fn parse_requirement(requirement: &str) -> Result<Requirement> {
    let invalid = || SelectorError::InvalidRequirement {
        requirement: requirement.to_owned(),
    };

    if let Some(key) = requirement.strip_prefix('!') {
        let key = valid_key(key.trim()).ok_or_else(invalid)?;
        return Ok(expression(key, "DoesNotExist", None));
    }

    if let Some((key, value)) = requirement.split_once("!=") {
        let key = valid_key(key.trim()).ok_or_else(invalid)?;
        return Ok(expression(key, "NotIn", Some(vec![value.trim().to_owned()])));
    }

    if let Some((key, value)) = requirement
        .split_once("==")
        .or_else(|| requirement.split_once('='))
    {
        let key = valid_key(key.trim()).ok_or_else(invalid)?;
        return Ok(Requirement::Equals(key.to_owned(), value.trim().to_owned()));
    }

    if let Some(open) = requirement.find('(') {
        let values = requirement[open..]
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(invalid)?;
        let mut head = requirement[..open].split_whitespace();
        let (Some(key), Some(operator), None) = (head.next(), head.next(), head.next()) else {
            return Err(invalid());
        };
        let operator = match operator {
            "in" => "In",
            "notin" => "NotIn",
            operator => return InvalidOperatorSnafu { operator }.fail(),
        };
        let values: Vec<String> = values
            .split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
            .collect();
        ensure!(!values.is_empty(), BinaryOperatorWithoutValuesSnafu { operator });

        let key = valid_key(key).ok_or_else(invalid)?;
        return Ok(expression(key, operator, Some(values)));
    }

    let key = valid_key(requirement).ok_or_else(invalid)?;
    Ok(expression(key, "Exists", None))
}

fn valid_key(key: &str) -> Option<&str> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'));
    valid.then_some(key)
}

fn expression(key: &str, operator: &str, values: Option<Vec<String>>) -> Requirement {
    Requirement::Expression(LabelSelectorRequirement {
        key: key.to_owned(),
        operator: operator.to_owned(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("app=nginx", "app=nginx")]
    #[case("app==nginx, tier=web", "app=nginx,tier=web")]
    #[case("env!=prod", "env notin (prod)")]
    #[case("env in (dev, qa),!legacy", "env in (dev, qa),!legacy")]
    #[case("app.kubernetes.io/name notin (a,b)", "app.kubernetes.io/name notin (a, b)")]
    #[case("backup", "backup")]
    fn parses_and_renders(#[case] input: &str, #[case] expected: &str) {
        let selector: Selector = input.parse().unwrap();
        assert_eq!(selector.to_string(), expected);
    }

    #[rstest]
    #[case("", SelectorError::EmptySelector)]
    #[case("env in (dev", SelectorError::UnbalancedParentheses { selector: "env in (dev".to_owned() })]
    #[case("env in ()", SelectorError::BinaryOperatorWithoutValues { operator: "In".to_owned() })]
    #[case("env within (a)", SelectorError::InvalidOperator { operator: "within".to_owned() })]
    #[case("a b", SelectorError::InvalidRequirement { requirement: "a b".to_owned() })]
    fn rejects_invalid_selectors(#[case] input: &str, #[case] expected: SelectorError) {
        assert_eq!(input.parse::<Selector>().unwrap_err(), expected);
    }

    #[test]
    fn or_selector_splits_alternatives() {
        let OrSelector(alternatives) = "app=nginx or app=redis,tier=cache".parse().unwrap();

        let rendered: Vec<String> = alternatives
            .iter()
            .map(|selector| selector.to_query_string().unwrap())
            .collect();
        assert_eq!(rendered, vec!["app=nginx", "app=redis,tier=cache"]);
    }

    #[test]
    fn display_of_missing_selector() {
        assert_eq!(display_selector(None), "<none>");
        assert_eq!(display_selector(Some(&LabelSelector::default())), "<none>");
    }

    #[test]
    fn invalid_operator_is_rejected_when_rendering() {
        let selector = LabelSelector {
            match_expressions: Some(vec![LabelSelectorRequirement {
                key: "foo".to_owned(),
                operator: "IllegalOperator".to_owned(),
                values: None,
            }]),
            match_labels: None,
        };

        assert_eq!(
            selector.to_query_string().unwrap_err(),
            SelectorError::InvalidOperator {
                operator: "IllegalOperator".to_owned()
            }
        );
    }
}
