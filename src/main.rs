use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

use scene_renderer::{run_headless, run_interactive, ProjectionMode, SceneDescription, WindowInitError};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let scene = match &options.path {
        Some(path) => SceneDescription::load(path)?,
        None => SceneDescription::default_scene(),
    };

    println!(
        "Loaded scene with {} meshes ({} lights)",
        scene.meshes.len(),
        scene.lights.len()
    );
    for mesh in &scene.meshes {
        println!(" - {} ({})", mesh.name, mesh.shape.name());
    }

    let projection = if options.orthographic {
        ProjectionMode::Orthographic
    } else {
        ProjectionMode::Perspective
    };

    if options.summary_only {
        return print_summary(&scene, projection);
    }
    match run_interactive(scene.clone(), projection) {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.downcast_ref::<WindowInitError>().is_some() {
                eprintln!(
                    "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
                );
                print_summary(&scene, projection)
            } else {
                Err(err)
            }
        }
    }
}

fn print_summary(scene: &SceneDescription, projection: ProjectionMode) -> Result<()> {
    let summary = run_headless(scene, projection)?;
    println!(
        "Rendered {} draw calls ({} lights active, {:?} projection)",
        summary.draw_calls, summary.active_lights, projection
    );
    Ok(())
}

struct CliOptions {
    path: Option<PathBuf>,
    summary_only: bool,
    orthographic: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut path = None;
        let mut summary_only = false;
        let mut orthographic = false;
        for arg in env::args().skip(1) {
            match arg.as_str() {
                "--summary-only" => summary_only = true,
                "--orthographic" => orthographic = true,
                other if other.starts_with("--") => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --summary-only or --orthographic"
                    ));
                }
                other => {
                    if path.is_some() {
                        return Err(anyhow!(
                            "Usage: scene-renderer [scene.xml] [--summary-only] [--orthographic]"
                        ));
                    }
                    path = Some(PathBuf::from(other));
                }
            }
        }
        Ok(Self {
            path,
            summary_only,
            orthographic,
        })
    }
}
