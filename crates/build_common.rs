// Shared build script helpers turning a crate README into its rustdoc page.
// Include this in build.rs files with: include!("../build_common.rs");
//
// Required imports in the including file:
//   use std::env;
//   use std::fs;
//   use std::path::Path;

/// Write the crate's README, rewritten for rustdoc, to `OUT_DIR/README_GENERATED.md`.
///
/// Rewrites applied to links:
/// - `src/domain/mod.rs` becomes `domain/mod` so rustdoc resolves the module
/// - `../memento-db/README.md` (a sibling crate) becomes `../memento_db/index.html`
/// - `../../README.md` becomes the repository URL from the workspace manifest
///
/// Without a README the package description is used, so the
/// `include_str!` in `lib.rs` always finds a file.
fn process_readme_for_rustdoc(crate_dir: &str) {
    println!("cargo:rerun-if-changed=README.md");
    println!("cargo:rerun-if-changed=../../Cargo.toml");

    let readme_path = Path::new(crate_dir).join("README.md");
    let content = fs::read_to_string(readme_path)
        .unwrap_or_else(|_| env::var("CARGO_PKG_DESCRIPTION").unwrap_or_default());

    let mut rustdoc_content = link_sibling_crates(
        &content.replace("](src/", "](").replace(".rs)", ")"),
    );

    if let Some(url) = get_workspace_repo_url(crate_dir) {
        rustdoc_content = rustdoc_content.replace("](../../README.md", &format!("]({url}"));
    }

    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("README_GENERATED.md");
    fs::write(dest_path, rustdoc_content).unwrap();
}

/// Point `](../<crate>/README.md)` links at the sibling crate's rustdoc index.
fn link_sibling_crates(content: &str) -> String {
    const PREFIX: &str = "](../";
    const SUFFIX: &str = "/README.md)";

    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(start) = rest.find(PREFIX) {
        let after = &rest[start + PREFIX.len()..];
        let target = after
            .find(SUFFIX)
            .map(|end| &after[..end])
            .filter(|name| !name.is_empty() && !name.contains(['/', ')', ' ']));

        out.push_str(&rest[..start]);
        match target {
            Some(name) => {
                out.push_str(&format!("](../{}/index.html)", name.replace('-', "_")));
                rest = &after[name.len() + SUFFIX.len()..];
            }
            None => {
                out.push_str(PREFIX);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Repository URL from the workspace `Cargo.toml`, if it declares one.
fn get_workspace_repo_url(crate_dir: &str) -> Option<String> {
    let workspace_toml = Path::new(crate_dir)
        .parent()? // crates/
        .parent()? // workspace root
        .join("Cargo.toml");

    let content = fs::read_to_string(workspace_toml).ok()?;

    content.lines().map(str::trim).find_map(|line| {
        if !line.starts_with("repository") || !line.contains('=') {
            return None;
        }
        let start = line.find('"')?;
        let end = line.rfind('"')?;
        (start < end).then(|| line[start + 1..end].to_string())
    })
}
