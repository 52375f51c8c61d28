//! `scale` dispatcher

use crate::command::{usage_error, ArgumentVector};
use crate::core::Result;
use crate::redirect::{self, RedirectGuard};
use crate::scaling::{scale_file, ScaleOptions};
use clap::Parser;
use log::{debug, info};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const SCALE_USAGE: &str = "\
Usage: scale [options] data_filename
options:
-l lower : x scaling lower limit (default -1)
-u upper : x scaling upper limit (default +1)
-y y_lower y_upper : y scaling limits (default: no y scaling)
-s save_filename : save scaling parameters to save_filename
-r restore_filename : restore scaling parameters from restore_filename
-q : quiet mode (no outputs)";

#[derive(Parser, Debug)]
#[command(
    name = crate::command::PROGRAM_NAME,
    disable_help_flag = true,
    allow_negative_numbers = true
)]
struct ScaleArgs {
    #[arg(short = 'l', default_value_t = -1.0)]
    lower: f64,

    #[arg(short = 'u', default_value_t = 1.0)]
    upper: f64,

    #[arg(short = 'y', num_args = 2, value_names = ["Y_LOWER", "Y_UPPER"])]
    y: Option<Vec<f64>>,

    #[arg(short = 's')]
    save: Option<PathBuf>,

    #[arg(short = 'r')]
    restore: Option<PathBuf>,

    #[arg(short = 'q')]
    quiet: bool,

    data_filename: PathBuf,
}

impl ScaleArgs {
    fn options(&self) -> ScaleOptions {
        ScaleOptions {
            lower: self.lower,
            upper: self.upper,
            y_range: self.y.as_deref().and_then(|y| match y {
                &[y_lower, y_upper] => Some((y_lower, y_upper)),
                _ => None,
            }),
            save: self.save.clone(),
            restore: self.restore.clone(),
        }
    }
}

/// Run `scale`, writing the scaled data to `output_path`
///
/// Argument errors are raised before the output file is touched. The
/// output sink is restored however scaling ends.
pub fn run(argv: &ArgumentVector, output_path: &Path) -> Result<()> {
    argv.require_arguments(SCALE_USAGE)?;
    let args = ScaleArgs::try_parse_from(argv.as_slice()).map_err(usage_error(SCALE_USAGE))?;
    let options = args.options();
    options.check()?;
    if args.quiet {
        debug!("quiet mode requested");
    }

    let _redirect = RedirectGuard::to_file(output_path)?;
    let mut out = BufWriter::new(redirect::output());
    scale_file(&options, &args.data_filename, &mut out)?;
    out.flush()?;

    info!(
        "scaled {} into {}",
        args.data_filename.display(),
        output_path.display()
    );
    Ok(())
}
