use std::*;
use collections::{HashMap, HashSet};
use ffi::OsString;
use path::Path;

use anyhow::{Error, Result};
use clap::error::ErrorKind;
use clap::{Arg, ArgAction, Command};
use config_manager::config;
use config_manager::{ClapSource, ConfigInit, ConfigOption, ConfigOptions, Source};

use crate::tokenizer::token::Keyword;

pub(crate) type ReservedSymbolsTable = HashMap<&'static str, Keyword>;

pub(crate) fn get_reserved_symbols() -> ReservedSymbolsTable {
    use Keyword::*;

    HashMap::from([
        ("program", Program),
        ("var", Var),
        ("array", Array),
        ("of", Of),
        ("begin", Begin),
        ("end", End),
        ("if", If),
        ("then", Then),
        ("else", Else),
        ("procedure", Procedure),
        ("return", Return),
        ("call", Call),
        ("while", While),
        ("do", Do),
        ("not", Not),
        ("or", Or),
        ("div", Div),
        ("and", And),
        ("char", Char),
        ("integer", Integer),
        ("boolean", Boolean),
        ("readln", Readln),
        ("writeln", Writeln),
        ("true", True),
        ("false", False),
        ("read", Read),
        ("write", Write),
        ("break", Break),
    ])
}

#[config(
    clap(version, author),
    env_prefix = "mpplc",
    file(
        format = "toml",
        clap(long = "config", short = 'c', help = "path to configuration file"),
        env = "mpplc_config",
        optional = true
    )
)]
struct InternalConfig {
    #[source(clap(long, short), env, config, default)]
    input: Option<String>,
    #[source(clap(long, short), env, config, default)]
    output: Option<String>,
    #[source(env, config, default = false)]
    xref: bool,
    #[source(env, config, default = false)]
    tokens: bool,
    #[source(env, config, default = false)]
    pretty: bool,
    #[source(env, config, default = false)]
    verbose: bool,
}

/// Command line switches. They are set by their mere presence, which the
/// derived options cannot express, and may also be enabled through the
/// environment or the configuration file.
const SWITCHES: [(&str, &str); 4] = [
    ("xref", "print the cross-reference table"),
    ("tokens", "print the token counts instead of compiling"),
    ("pretty", "print the reformatted program"),
    ("verbose", "log the compiler's decisions"),
];

fn command() -> Command {
    SWITCHES
        .iter()
        .fold(InternalConfig::get_command(), |command, &(name, help)| {
            command.arg(Arg::new(name).long(name).help(help).action(ArgAction::SetTrue))
        })
}

#[derive(Clone, Debug)]
pub struct Config {
    pub(crate) input: String,
    pub(crate) output: String,
    pub(crate) xref: bool,
    pub(crate) tokens: bool,
    pub(crate) pretty: bool,
    pub(crate) verbose: bool,
}

/// `sample.mpl` becomes `sample.csl`; a name without extension gets one.
pub(crate) fn default_output_path(input: &str) -> String {
    Path::new(input)
        .with_extension("csl")
        .to_string_lossy()
        .into_owned()
}

impl Config {
    pub fn try_parse() -> Result<Self> {
        Self::try_parse_from(env::args_os(), HashSet::new())
    }

    fn try_parse_from<I, T>(args: I, mut options: ConfigOptions) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = match command().try_get_matches_from(args) {
            Ok(matches) => matches,
            Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                err.exit()
            }
            Err(err) => Err(err)?,
        };
        let switch = |name: &str| matches.get_flag(name);
        let (xref_switch, tokens_switch, pretty_switch, verbose_switch) =
            (switch("xref"), switch("tokens"), switch("pretty"), switch("verbose"));
        options.insert(ConfigOption::ExplicitSource(Source::Clap(ClapSource::Matches(matches))));
        let config = InternalConfig::parse_options(options)?;

        let InternalConfig {
            input,
            output,
            xref,
            tokens,
            pretty,
            verbose,
        } = config;

        let input = match input {
            Some(input) if !input.is_empty() => input,
            _ => Err(Error::msg("no input file given, use --input <file.mpl>"))?,
        };
        let output = output.unwrap_or_else(|| default_output_path(&input));
        if output == input {
            Err(Error::msg(format!(
                "the output file {output} would overwrite the input file",
            )))?
        }

        Ok(Self {
            input,
            output,
            xref: xref || xref_switch,
            tokens: tokens || tokens_switch,
            pretty: pretty || pretty_switch,
            verbose: verbose || verbose_switch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(default_output_path("sample11.mpl"), "sample11.csl");
        assert_eq!(default_output_path("dir/a.b.mpl"), "dir/a.b.csl");
        assert_eq!(default_output_path("noext"), "noext.csl");
    }

    /// Parses `args` with an empty environment and no configuration file.
    fn parse(args: &[&str]) -> Result<Config> {
        let isolated = ConfigOption::ExplicitSource(Source::Env(HashMap::new()));
        Config::try_parse_from(args.iter().copied(), HashSet::from([isolated]))
    }

    #[test]
    fn test_switches_and_default_output() {
        let config = parse(&["mpplc", "--input", "a.mpl", "--xref"]).unwrap();
        assert_eq!(config.input, "a.mpl");
        assert_eq!(config.output, "a.csl");
        assert!(config.xref);
        assert!(!config.tokens && !config.pretty && !config.verbose);

        let config = parse(&["mpplc", "-i", "a.mpl", "-o", "out.csl", "--pretty", "--tokens"]).unwrap();
        assert_eq!(config.output, "out.csl");
        assert!(config.pretty && config.tokens && !config.xref);
    }

    #[test]
    fn test_invalid_command_lines() {
        assert!(parse(&["mpplc"]).is_err());
        assert!(parse(&["mpplc", "--input", "a.mpl", "--output", "a.mpl"]).is_err());
        assert!(parse(&["mpplc", "--input", "a.mpl", "--xref", "true"]).is_err());
    }

    #[test]
    fn test_every_keyword_is_reserved() {
        let reserved = get_reserved_symbols();
        assert_eq!(reserved.len(), 28);
        assert_eq!(reserved.get("writeln"), Some(&Keyword::Writeln));
        assert_eq!(reserved.get("Program"), None);
    }
}
