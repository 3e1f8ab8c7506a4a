//! YAML output of `-o yaml`: every object becomes its own `---` document.
use std::io::Write;

use snafu::{ResultExt, Snafu};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to serialize YAML"))]
    SerializeYaml { source: serde_yaml::Error },

    #[snafu(display("failed to write YAML document"))]
    WriteDocument { source: std::io::Error },
}

/// Writes every item as an explicit YAML document.
pub fn write_documents<'a, T, I, W>(items: I, mut writer: W) -> Result<()>
where
    T: serde::Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
    W: Write,
{
    for item in items {
        writer.write_all(b"---\n").context(WriteDocumentSnafu)?;
        serde_yaml::to_writer(&mut writer, item).context(SerializeYamlSnafu)?;
    }
    writer.flush().context(WriteDocumentSnafu)
}

/// [`write_documents`] to stdout.
pub fn print_documents<'a, T, I>(items: I) -> Result<()>
where
    T: serde::Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    write_documents(items, std::io::stdout().lock())
}
