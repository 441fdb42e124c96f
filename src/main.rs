mod args;
mod bmd_writer;
mod class_compactor;
mod class_registry;
mod crunch;
mod crunch_processor;
mod errors;
mod id_map;
mod instance_compactor;
mod parser;
mod summary;
mod utils;

use std::time::Instant;

use crate::args::Args;
use crate::args::get_args;
use crate::crunch::{CrunchOptions, crunch_file};
use crate::errors::HprofCrunchError;

fn main() {
    std::process::exit(match main_result() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    });
}

fn main_result() -> Result<(), HprofCrunchError> {
    let now = Instant::now();
    let Args {
        input_file,
        output_file,
        full_strings,
        debug,
        json_output,
    } = get_args()?;
    let options = CrunchOptions {
        hashed_strings: !full_strings,
        debug_mode: debug,
    };
    let summary = crunch_file(&input_file, &output_file, &options)?;
    if json_output {
        summary.save_as_file()?;
    }
    print!("{}", summary.render());
    println!("BMD written to '{output_file}' in {:?}", now.elapsed());
    Ok(())
}
