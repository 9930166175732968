use chess_scanner::classifier::DebugFieldConfig;
use chess_scanner::scanner::{self, save_fields, save_image};
use chess_scanner::{Config, load_templates, scan_file};
use clap::Parser;
use clap::error::ErrorKind;
use log::{debug, warn};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Photo of the chessboard.
    image: PathBuf,
    /// Directory with one image per template, named after its label (e.g. `pawn_wb.png`).
    #[arg(short, long, default_value = "square_templates")]
    templates: PathBuf,
    /// JSON file overriding (parts of) the default configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Save the cropped board to this file.
    #[arg(long)]
    save_board: Option<PathBuf>,
    /// Save the crop of every field into this directory.
    #[arg(long)]
    save_fields: Option<PathBuf>,
    /// Log the template scores of a specific field (e.g. `e4`), of `all` fields or of `none`.
    #[arg(long, default_value = "none")]
    debug_field: DebugFieldConfig,
}

fn run(cli: &Cli) -> scanner::Result<String> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    config.classifier.debug_field = cli.debug_field;

    let templates = load_templates(&cli.templates, &config.classifier)?;
    let unrecognized = templates.unrecognized().collect::<Vec<_>>();
    if !unrecognized.is_empty() {
        warn!(
            "{} templates have no known label: {:?}",
            unrecognized.len(),
            unrecognized
        );
    }

    let result = scan_file(&cli.image, &templates, &config)?;
    debug!("{}", result.board);

    if let Some(path) = &cli.save_board {
        save_image(path, &result.board_image)?;
        println!("Cropped chessboard saved as '{}'", path.display());
    }
    if let Some(dir) = &cli.save_fields {
        save_fields(dir, &result.board_image, &config.classifier)?;
        println!("Fields saved to '{}'", dir.display());
    }

    #[cfg(feature = "show_debug_screens")]
    opencv::highgui::wait_key_def()?;

    Ok(result.fen())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(1);
        }
    };

    match run(&cli) {
        Ok(fen) => {
            println!("{}", fen);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
