//! Values of the structured command line flags.

use std::{collections::BTreeMap, str::FromStr};

use snafu::{OptionExt, Snafu, ensure};

use crate::crd::velero::SecretKeyReference;

type Result<T, E = ParseFlagError> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Snafu)]
pub enum ParseFlagError {
    #[snafu(display("expected {expected}, got {input:?}"))]
    InvalidPair {
        input: String,
        expected: &'static str,
    },

    #[snafu(display("key must not be empty in {input:?}"))]
    EmptyKey { input: String },
}

/// Comma separated `key=value` pairs, as taken by `--labels`, `--annotations`
/// and `--config`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyValuePairs(pub BTreeMap<String, String>);

impl FromStr for KeyValuePairs {
    type Err = ParseFlagError;

    fn from_str(input: &str) -> Result<Self> {
        split_pairs(input, ',', '=', "key=value pairs").map(Self)
    }
}

/// Merges the pairs of a repeated flag, later values win.
pub fn merge_pairs(flags: &[KeyValuePairs]) -> BTreeMap<String, String> {
    flags
        .iter()
        .flat_map(|KeyValuePairs(pairs)| pairs.clone())
        .collect()
}

/// `--namespace-mappings src1:dst1,src2:dst2`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NamespaceMappings(pub BTreeMap<String, String>);

impl FromStr for NamespaceMappings {
    type Err = ParseFlagError;

    fn from_str(input: &str) -> Result<Self> {
        split_pairs(input, ',', ':', "src:dst pairs").map(Self)
    }
}

/// `--ordered-resources 'pods=ns1/pod1,ns1/pod2;persistentvolumeclaims=ns1/pvc4'`.
///
/// Maps a resource kind to the comma separated names backed up first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderedResources(pub BTreeMap<String, String>);

impl FromStr for OrderedResources {
    type Err = ParseFlagError;

    fn from_str(input: &str) -> Result<Self> {
        split_pairs(input, ';', '=', "resource=namespace/name,... entries").map(Self)
    }
}

/// `--credential secret-name=key`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialFlag(pub SecretKeyReference);

impl FromStr for CredentialFlag {
    type Err = ParseFlagError;

    fn from_str(input: &str) -> Result<Self> {
        let (name, key) = input
            .split_once('=')
            .filter(|(name, key)| !name.trim().is_empty() && !key.trim().is_empty())
            .context(InvalidPairSnafu {
                input,
                expected: "secret-name=key",
            })?;

        Ok(Self(SecretKeyReference {
            name: name.trim().to_owned(),
            key: key.trim().to_owned(),
        }))
    }
}

fn split_pairs(
    input: &str,
    separator: char,
    assignment: char,
    expected: &'static str,
) -> Result<BTreeMap<String, String>> {
    let mut pairs = BTreeMap::new();

    for pair in input
        .split(separator)
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
    {
        let (key, value) = pair
            .split_once(assignment)
            .context(InvalidPairSnafu { input, expected })?;
        let key = key.trim();
        ensure!(!key.is_empty(), EmptyKeySnafu { input });

        pairs.insert(key.to_owned(), value.trim().to_owned());
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[rstest]
    #[case("", &[])]
    #[case("app=nginx", &[("app", "nginx")])]
    #[case("app=nginx, team=a,", &[("app", "nginx"), ("team", "a")])]
    #[case("empty=", &[("empty", "")])]
    fn key_value_pairs(#[case] input: &str, #[case] expected: &[(&str, &str)]) {
        assert_eq!(input.parse::<KeyValuePairs>().unwrap().0, map(expected));
    }

    #[rstest]
    #[case("novalue")]
    #[case("=value")]
    fn invalid_key_value_pairs(#[case] input: &str) {
        assert!(input.parse::<KeyValuePairs>().is_err());
    }

    #[test]
    fn later_pairs_win_when_merging() {
        let flags = vec![
            "a=1,b=2".parse::<KeyValuePairs>().unwrap(),
            "b=3".parse().unwrap(),
        ];
        assert_eq!(merge_pairs(&flags), map(&[("a", "1"), ("b", "3")]));
    }

    #[test]
    fn namespace_mappings() {
        let NamespaceMappings(mappings) = "prod:staging,team-a:team-b".parse().unwrap();
        assert_eq!(mappings, map(&[("prod", "staging"), ("team-a", "team-b")]));

        assert!("prod=staging".parse::<NamespaceMappings>().is_err());
    }

    #[test]
    fn ordered_resources_keep_name_lists() {
        let OrderedResources(resources) = "pods=ns1/pod1,ns1/pod2;persistentvolumeclaims=ns1/pvc4"
            .parse()
            .unwrap();

        assert_eq!(
            resources,
            map(&[
                ("pods", "ns1/pod1,ns1/pod2"),
                ("persistentvolumeclaims", "ns1/pvc4")
            ])
        );
    }

    #[rstest]
    #[case("cloud-credentials=cloud", Some(("cloud-credentials", "cloud")))]
    #[case("cloud-credentials", None)]
    #[case("cloud-credentials=", None)]
    fn credential(#[case] input: &str, #[case] expected: Option<(&str, &str)>) {
        let parsed = input.parse::<CredentialFlag>().ok().map(|CredentialFlag(secret)| secret);
        let expected = expected.map(|(name, key)| SecretKeyReference {
            name: name.to_owned(),
            key: key.to_owned(),
        });
        assert_eq!(parsed, expected);
    }
}
