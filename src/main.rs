use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use log::{error, info, warn};
use pdf2png::{rendered_pages, Error};

/// Render every page of a PDF as `page-<N>.png`.
#[derive(Parser, Debug)]
#[command(name = "pdf2png", version, about)]
struct Args {
    /// The PDF file to render
    pdf_path: PathBuf,
    /// The directory the PNG files are written to
    output_dir: PathBuf,
    /// The scale factor, 1.0 renders one pixel per point
    scale: f32,
}

fn parse_args<I, T>(args: I) -> pdf2png::Result<Args>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Args::try_parse_from(args).map_err(|e| match e.kind() {
        ErrorKind::MissingRequiredArgument => Error::InvalidArgument(e.to_string()),
        _ => e.exit(),
    })
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args(std::env::args_os()) {
        Ok(args) => args,
        Err(err) => {
            error!("{}", err);
            return ExitCode::from(2);
        }
    };

    match pdf2png::render(&args.pdf_path, &args.output_dir, args.scale) {
        Ok(written) => info!(
            "wrote {} pages to {}",
            written.len(),
            args.output_dir.display()
        ),
        Err(err) => {
            error!("{}", err);
            if let Ok(pages) = rendered_pages(&args.output_dir) {
                if !pages.is_empty() {
                    warn!(
                        "{} page images left in {}",
                        pages.len(),
                        args.output_dir.display()
                    );
                }
            }
        }
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_positionals_are_accepted() {
        let args = parse_args(["pdf2png", "in.pdf", "out", "1.5"]).unwrap();
        assert_eq!(args.pdf_path, PathBuf::from("in.pdf"));
        assert_eq!(args.output_dir, PathBuf::from("out"));
        assert_eq!(args.scale, 1.5);
    }

    #[test]
    fn missing_argument_is_named() {
        match parse_args(["pdf2png", "in.pdf", "out"]) {
            Err(Error::InvalidArgument(msg)) => assert!(msg.contains("<SCALE>")),
            other => panic!("expected a missing argument, got {:?}", other.map(|_| ())),
        }

        match parse_args(["pdf2png"]) {
            Err(Error::InvalidArgument(msg)) => assert!(msg.contains("<PDF_PATH>")),
            other => panic!("expected a missing argument, got {:?}", other.map(|_| ())),
        }
    }
}
