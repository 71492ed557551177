use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rootcause::Report;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use meshpack::error::PackError;
use meshpack::export::{ExportOptions, MATERIALS_DIRECTORY, MeshExporter, mesh_directory};
use meshpack::import::{ImportOptions, MaterialConvention, MeshImporter};
use meshpack::scene::PostProcess;

/// Convert a glTF or OBJ scene into meshpack container files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scene file to import (.gltf, .glb or .obj)
    input: PathBuf,

    /// Directory that receives a <scene>/ directory of .mesh files and a Materials/ directory
    output: PathBuf,

    /// Request compressed output (not supported by format version 1)
    #[clap(long)]
    compress: bool,

    /// Also write <scene>.meta.json describing the export
    #[clap(long)]
    metadata: bool,

    /// Material convention; inferred from the input extension when omitted
    #[clap(long, value_enum)]
    convention: Option<MaterialConvention>,

    /// Flip the V texture coordinate
    #[clap(long)]
    flip_uvs: bool,

    /// Log at debug level
    #[clap(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install log subscriber: {e}");
    }
}

fn run(args: &Args) -> Result<(), Report<PackError>> {
    let import_options = ImportOptions::builder()
        .maybe_convention(args.convention)
        .post_process(PostProcess {
            flip_uvs: args.flip_uvs,
            ..PostProcess::default()
        })
        .build();
    let result = MeshImporter.import_mesh(&args.input, &import_options)?;

    for directory in [
        mesh_directory(&args.output, &result.name),
        args.output.join(MATERIALS_DIRECTORY),
    ] {
        std::fs::create_dir_all(&directory).map_err(|source| {
            Report::new(PackError::Io {
                path: directory.clone(),
                source,
            })
        })?;
    }

    let export_options = ExportOptions::builder()
        .output_directory(&args.output)
        .use_compression(args.compress)
        .output_metadata(args.metadata)
        .build();
    MeshExporter.export_mesh(&result, &export_options)?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            error!("{report}");
            ExitCode::FAILURE
        }
    }
}
