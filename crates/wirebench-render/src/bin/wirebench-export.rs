//! Render a saved diagram to SVG.
//!
//! Usage: `wirebench-export <diagram.json> <schema-dir> [out.svg]`

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use kurbo::{Point, Size};
use wirebench_core::{Diagram, Editor, EditorEvent, SchemaCatalog};
use wirebench_render::{RenderContext, Renderer, SvgRenderer};

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (diagram_path, schema_dir, out_path) = match args.as_slice() {
        [diagram, schemas] => {
            let diagram = PathBuf::from(diagram);
            let out = diagram.with_extension("svg");
            (diagram, PathBuf::from(schemas), out)
        }
        [diagram, schemas, out] => (
            PathBuf::from(diagram),
            PathBuf::from(schemas),
            PathBuf::from(out),
        ),
        _ => {
            eprintln!("usage: wirebench-export <diagram.json> <schema-dir> [out.svg]");
            return ExitCode::from(2);
        }
    };

    match pollster::block_on(run(diagram_path, schema_dir, out_path)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    diagram_path: PathBuf,
    schema_dir: PathBuf,
    out_path: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(&diagram_path)?;
    let diagram = Diagram::from_json(&json)?;
    log::info!(
        "Loaded {} parts and {} connections from {}",
        diagram.part_count(),
        diagram.connection_count(),
        diagram_path.display()
    );

    let catalog = Arc::new(SchemaCatalog::from_directory(schema_dir));
    let mut editor = Editor::builder()
        .container(Point::ZERO, Size::new(1024.0, 768.0))
        .catalog(catalog)
        .build()?;
    editor.load_diagram(diagram).await;
    for event in editor.take_events() {
        if let EditorEvent::Notification(message) = event {
            log::warn!("{}", message);
        }
    }

    let mut renderer = SvgRenderer::new();
    renderer.build_scene(&RenderContext::for_export(&editor).with_handles(false));
    renderer.write_to(&out_path)?;
    Ok(())
}
