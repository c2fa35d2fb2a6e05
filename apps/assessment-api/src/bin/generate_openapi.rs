use utoipa::OpenApi;

fn main() {
    let spec = assessment_api::routes::ApiDoc::openapi()
        .to_pretty_json()
        .expect("OpenAPI document serializes");
    let out = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../specs/assessment-api.json");
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent).expect("failed to create specs directory");
    }
    std::fs::write(&out, spec).expect("failed to write OpenAPI document");
    println!("Wrote {}", out.display());
}
