//! Printing of `get` and `describe` results.

use oadp_client::describe::table::Table;
use serde::Serialize;
use snafu::{ResultExt, Snafu};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to print objects as YAML"))]
    PrintYaml { source: oadp_shared::yaml::Error },

    #[snafu(display("failed to serialize objects as JSON"))]
    SerializeJson { source: serde_json::Error },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    /// Columns for `get`, readable text for `describe`.
    #[default]
    Table,
    Yaml,
    Json,
}

#[derive(clap::Args, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OutputFlags {
    /// Output format.
    #[arg(short = 'o', long, value_enum, default_value_t, value_name = "FORMAT")]
    pub output: OutputFormat,
}

/// Several objects as printed by `kubectl get -o json`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct List<'a, K> {
    api_version: &'static str,
    kind: &'static str,
    items: &'a [K],
}

/// Prints `objects` in the requested format. `table` renders the columns of
/// the table format.
pub fn print_objects<K: Serialize>(
    format: OutputFormat,
    objects: &[K],
    namespace: &str,
    table: impl FnOnce(&[K]) -> Table,
) -> Result<()> {
    if print_serialized(format, objects)? {
        return Ok(());
    }

    if objects.is_empty() {
        eprintln!("No resources found in {namespace} namespace.");
    } else {
        print!("{}", table(objects).render());
    }
    Ok(())
}

/// Prints `objects` as YAML or JSON. Returns `false` for the table format,
/// which every command renders in its own way.
pub fn print_serialized<K: Serialize>(format: OutputFormat, objects: &[K]) -> Result<bool> {
    match format {
        OutputFormat::Table => return Ok(false),
        OutputFormat::Yaml => oadp_shared::yaml::print_documents(objects).context(PrintYamlSnafu)?,
        OutputFormat::Json => println!("{}", to_json(objects)?),
    }
    Ok(true)
}

/// A single object is printed as itself, several as a `List`.
fn to_json<K: Serialize>(objects: &[K]) -> Result<String> {
    match objects {
        [object] => serde_json::to_string_pretty(object),
        items => serde_json::to_string_pretty(&List {
            api_version: "v1",
            kind: "List",
            items,
        }),
    }
    .context(SerializeJsonSnafu)
}
