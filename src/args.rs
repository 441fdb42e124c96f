use crate::errors::HprofCrunchError;
use crate::errors::HprofCrunchError::InputFileNotFound;
use clap::{Arg, ArgMatches, Command};
use clap::{crate_authors, crate_description, crate_name, crate_version};
use std::path::Path;

const OUTPUT_EXTENSION: &str = "bmd";

fn command() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .author(crate_authors!("\n"))
        .about(crate_description!())
        .arg(
            Arg::new("inputFile")
                .help("binary hprof input file")
                .long("inputFile")
                .short('i')
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new("outputFile")
                .help("BMD output file, defaults to the input file with a .bmd extension")
                .long("outputFile")
                .short('o')
                .num_args(1)
                .required(false),
        )
        .arg(
            Arg::new("fullStrings")
                .help("write strings in full instead of their hash")
                .long("fullStrings")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .help("debug info")
                .long("debug")
                .short('d')
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .help("additional JSON summary in file")
                .long("json")
                .action(clap::ArgAction::SetTrue),
        )
}

pub fn get_args() -> Result<Args, HprofCrunchError> {
    args_from_matches(&command().get_matches())
}

fn args_from_matches(matches: &ArgMatches) -> Result<Args, HprofCrunchError> {
    let input_file = matches
        .get_one::<String>("inputFile")
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    if !Path::new(&input_file).is_file() {
        return Err(InputFileNotFound { name: input_file });
    }

    let output_file = match matches.get_one::<String>("outputFile") {
        Some(output_file) => output_file.trim().to_string(),
        None => default_output_file(&input_file),
    };

    Ok(Args {
        input_file,
        output_file,
        full_strings: matches.get_flag("fullStrings"),
        debug: matches.get_flag("debug"),
        json_output: matches.get_flag("json"),
    })
}

fn default_output_file(input_file: &str) -> String {
    Path::new(input_file)
        .with_extension(OUTPUT_EXTENSION)
        .to_string_lossy()
        .to_string()
}

pub struct Args {
    pub input_file: String,
    pub output_file: String,
    pub full_strings: bool,
    pub debug: bool,
    pub json_output: bool,
}

#[cfg(test)]
mod args_tests {
    use crate::args::{args_from_matches, command, default_output_file};
    use crate::errors::HprofCrunchError;

    #[test]
    fn verify_command() {
        command().debug_assert();
    }

    #[test]
    fn output_defaults_next_to_input() {
        assert_eq!(default_output_file("dumps/heap.hprof"), "dumps/heap.bmd");
        assert_eq!(default_output_file("heap"), "heap.bmd");
    }

    #[test]
    fn missing_input_file() {
        let matches = command().get_matches_from(["hprof-crunch", "-i", "does-not-exist.hprof"]);
        let result = args_from_matches(&matches);
        assert!(matches!(
            result,
            Err(HprofCrunchError::InputFileNotFound { .. })
        ));
    }

    #[test]
    fn flags_and_explicit_output() {
        let input = std::env::temp_dir().join(format!("hprof-crunch-args-{}.hprof", std::process::id()));
        std::fs::write(&input, b"").unwrap();
        let input_name = input.to_string_lossy().to_string();
        let matches = command().get_matches_from([
            "hprof-crunch",
            "-i",
            input_name.as_str(),
            "-o",
            "out.bmd",
            "--fullStrings",
            "--json",
        ]);
        let args = args_from_matches(&matches).unwrap();
        assert_eq!(args.input_file, input_name);
        assert_eq!(args.output_file, "out.bmd");
        assert!(args.full_strings);
        assert!(args.json_output);
        assert!(!args.debug);
        std::fs::remove_file(input).unwrap();
    }
}
