//! Writes the OpenAPI document for the HTTP surface.
//!
//! Usage: `openapi [OUTPUT]` (defaults to `openapi.json`; `-` prints to stdout).

use std::path::Path;
use utoipa::OpenApi;
use voicebridge_api::router::ApiDoc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = std::env::args().nth(1).unwrap_or_else(|| "openapi.json".to_string());
    let spec_json = ApiDoc::openapi().to_pretty_json()?;

    if output == "-" {
        println!("{spec_json}");
    } else {
        std::fs::write(Path::new(&output), spec_json)?;
        eprintln!("Wrote OpenAPI document to {output}");
    }
    Ok(())
}
