//! Asset discovery: a build manifest or an output directory walk.

use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;

use cdnsync_core::{Asset, AssetEntry, Manifest};

/// Every regular file under `root` as an emitted entry, named by its
/// `/`-separated relative path and sorted by name. Symlinks are followed,
/// so a linked file is emitted under the link's name.
pub fn manifest_from_dir(root: &Path) -> Result<Manifest> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.with_context(|| format!("cannot walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        entries.push(AssetEntry {
            name,
            local_path: path.to_path_buf(),
            emitted: true,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Manifest { entries })
}

/// Resolve the emitted assets from either source.
pub fn load(dir: Option<&Path>, manifest: Option<&Path>) -> Result<Vec<Asset>> {
    let manifest = match (dir, manifest) {
        (Some(dir), _) => manifest_from_dir(dir)?,
        (None, Some(path)) => Manifest::load_at(path)
            .with_context(|| format!("failed to load manifest '{}'", path.display()))?,
        (None, None) => anyhow::bail!("provide --dir or --manifest"),
    };
    Ok(manifest.emitted())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn walk_names_are_relative_and_sorted() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("js/chunks")).unwrap();
        std::fs::write(tmp.path().join("index.html"), "i").unwrap();
        std::fs::write(tmp.path().join("js/app.js"), "a").unwrap();
        std::fs::write(tmp.path().join("js/chunks/1.js"), "c").unwrap();

        let manifest = manifest_from_dir(tmp.path()).unwrap();
        let names: Vec<_> = manifest.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["index.html", "js/app.js", "js/chunks/1.js"]);
        assert!(manifest.entries.iter().all(|e| e.emitted));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_file_is_emitted_under_link_name() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("dist");
        std::fs::create_dir_all(&out).unwrap();
        let target = tmp.path().join("shared.css");
        std::fs::write(&target, "body{}").unwrap();
        std::fs::write(out.join("app.js"), "a").unwrap();
        std::os::unix::fs::symlink(&target, out.join("theme.css")).unwrap();

        let manifest = manifest_from_dir(&out).unwrap();
        let names: Vec<_> = manifest.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["app.js", "theme.css"]);
        let linked = &manifest.entries[1];
        assert_eq!(std::fs::read_to_string(&linked.local_path).unwrap(), "body{}");
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_is_walked() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("dist");
        let vendor = tmp.path().join("vendor");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::create_dir_all(&vendor).unwrap();
        std::fs::write(vendor.join("lib.js"), "v").unwrap();
        std::os::unix::fs::symlink(&vendor, out.join("vendor")).unwrap();

        let manifest = manifest_from_dir(&out).unwrap();
        let names: Vec<_> = manifest.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["vendor/lib.js"]);
    }

    #[test]
    fn manifest_file_drops_unemitted() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.json");
        std::fs::write(
            &path,
            r#"[{"name":"a.js","localPath":"/out/a.js"},{"name":"b.js","localPath":"/out/b.js","emitted":false}]"#,
        )
        .unwrap();
        let assets = load(None, Some(&path)).unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].name, "a.js");
    }

    #[test]
    fn no_source_is_error() {
        assert!(load(None, None).is_err());
    }
}
