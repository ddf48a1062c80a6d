//! Invocation flags shared by every plugin.
//!
//! A plugin invocation accepts GNU-style long options (`--name=value` and
//! `--name value`). `--protocol` and `--spec` answer handshake queries and
//! are mutually exclusive; `--format` selects the body serialisation; any
//! positional residue is the procedure selector. Unknown flags are an
//! error. `-h`/`--help` renders usage, including the server documentation
//! preamble and the procedure table.

use clap::error::ErrorKind;
use clap::{CommandFactory, FromArgMatches, Parser};

use crate::error::Error;
use crate::format::Format;
use crate::procedure::Procedure;
use crate::spec::Spec;

/// Version of the invocation protocol spoken across the process boundary.
pub const PROTOCOL_VERSION: u32 = 1;

/// Name of the protocol handshake flag.
pub const PROTOCOL_FLAG: &str = "protocol";

/// Name of the spec handshake flag.
pub const SPEC_FLAG: &str = "spec";

/// Name of the format selection flag.
pub const FORMAT_FLAG: &str = "format";

#[derive(Parser, Debug)]
#[command(name = "plugin", no_binary_name = true)]
struct InvocationFlags {
    /// Print the protocol version to stdout and exit.
    #[arg(long, conflicts_with = "spec")]
    protocol: bool,

    /// Print the plugin spec to stdout in the selected format and exit.
    #[arg(long)]
    spec: bool,

    /// Serialisation format for request, response, and spec bodies.
    #[arg(long, value_enum, ignore_case = true, default_value_t = Format::Binary)]
    format: Format,

    /// Procedure selector: either a procedure path or its declared args.
    #[arg(value_name = "SELECTOR")]
    selector: Vec<String>,
}

/// A parsed plugin invocation.
#[derive(Debug)]
pub(crate) enum Invocation {
    /// `-h`/`--help`: the rendered help text to print on stdout.
    Help(String),
    /// `--protocol`: print the protocol version.
    Protocol,
    /// `--spec`: print the spec in the given format.
    PrintSpec {
        /// Requested serialisation format.
        format: Format,
    },
    /// Positional selector naming a procedure.
    Call {
        /// Positional args as given.
        selector: Vec<String>,
        /// Requested serialisation format.
        format: Format,
    },
}

/// Parses the invocation args against the given spec.
pub(crate) fn parse(
    args: &[String],
    spec: &Spec,
    doc: Option<&str>,
) -> Result<Invocation, Error> {
    let mut command = InvocationFlags::command().after_help(procedure_table(spec));
    if let Some(doc) = doc {
        command = command.about(doc.to_owned());
    }
    let matches = match command.try_get_matches_from(args.iter().map(String::as_str)) {
        Ok(matches) => matches,
        Err(err) if err.kind() == ErrorKind::DisplayHelp => {
            return Ok(Invocation::Help(err.render().to_string()));
        }
        Err(err) => {
            return Err(Error::Usage {
                message: err.render().to_string(),
            });
        }
    };
    let flags = InvocationFlags::from_arg_matches(&matches).map_err(|err| Error::Usage {
        message: err.render().to_string(),
    })?;
    if flags.protocol {
        return Ok(Invocation::Protocol);
    }
    if flags.spec {
        return Ok(Invocation::PrintSpec {
            format: flags.format,
        });
    }
    Ok(Invocation::Call {
        selector: flags.selector,
        format: flags.format,
    })
}

/// Renders the procedure table shown at the end of the help text.
fn procedure_table(spec: &Spec) -> String {
    let mut table = String::from("Procedures:");
    for procedure in spec.procedures() {
        table.push_str(&render_procedure_row(procedure));
    }
    table
}

fn render_procedure_row(procedure: &Procedure) -> String {
    if procedure.args().is_empty() {
        format!("\n  {}", procedure.path())
    } else {
        format!("\n  {}  ({})", procedure.path(), procedure.args().join(" "))
    }
}

/// Renders the protocol version as printed by `--protocol`.
pub(crate) fn encode_protocol(version: u32) -> Vec<u8> {
    format!("{version}\n").into_bytes()
}

/// Parses a `--protocol` reply: whitespace-trimmed ASCII integer.
pub(crate) fn decode_protocol(data: &[u8]) -> Result<u32, Error> {
    let text = String::from_utf8_lossy(data);
    let trimmed = text.trim();
    trimmed.parse().map_err(|_| Error::Handshake {
        message: format!("invalid protocol version: '{trimmed}'"),
    })
}

#[cfg(test)]
mod tests;
