use camera_model_transfer::{HelpPrinter, TransferSettings};
use log::*;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "camera-model-transfer",
    about = "A tool to convert fisheye camera models between the universal and Kannala-Brandt forms"
)]
struct Opt {
    /// Number of Kannala-Brandt coefficients to fit, including the leading 1.
    #[structopt(short, long, default_value = "5")]
    order: usize,
    /// The run config describing the conversion.
    #[structopt(parse(from_os_str))]
    config: PathBuf,
}

fn init_logger(level: LevelFilter) {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn main() {
    let opt = Opt::from_args();
    let mut help = HelpPrinter::default();

    let settings = TransferSettings::load(&opt.config);
    init_logger(
        settings
            .as_ref()
            .map_or(LevelFilter::Info, TransferSettings::level_filter),
    );
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            if e.wants_help() {
                help.print();
            }
            std::process::exit(1);
        }
    };
    if settings.help {
        help.print();
    }

    match camera_model_transfer::run(&settings, opt.order) {
        Ok(report) => info!(
            "saved {} model to {}",
            report.model.kind(),
            settings.destination.display()
        ),
        Err(e) => {
            error!("{}", e);
            if e.wants_help() {
                help.print();
            }
            std::process::exit(1);
        }
    }
}
