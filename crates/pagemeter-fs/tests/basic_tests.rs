//! Basic tests for the native FileSystem and the directory scanner.

use pagemeter_fs::{scan, FileSystem, NativeFileSystem};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn js_filter() -> Regex {
    Regex::new(r"\.(?:js|jsx|ts|tsx)$").unwrap()
}

fn touch(path: PathBuf) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "export default () => null").unwrap();
}

#[tokio::test]
async fn test_native_read() {
    let temp_dir = TempDir::new().unwrap();
    let fs = NativeFileSystem::new(temp_dir.path()).unwrap();

    let test_file = temp_dir.path().join("test.txt");
    fs::write(&test_file, "Hello, World!").unwrap();

    let read_contents = fs.read_to_string(&test_file).await.unwrap();
    assert_eq!(read_contents, "Hello, World!");
    assert!(fs.exists(&test_file).await.unwrap());
}

#[tokio::test]
async fn test_native_metadata() {
    let temp_dir = TempDir::new().unwrap();
    let fs = NativeFileSystem::new(temp_dir.path()).unwrap();

    let test_file = temp_dir.path().join("test.txt");
    fs::write(&test_file, "Hello, World!").unwrap();

    let metadata = fs.metadata(&test_file).await.unwrap();
    assert!(metadata.exists);
    assert!(metadata.is_file);
    assert!(!metadata.is_dir);
    assert_eq!(metadata.size, 13);

    let missing = fs.metadata(&temp_dir.path().join("nope.txt")).await.unwrap();
    assert!(!missing.exists);
}

#[tokio::test]
async fn test_native_read_dir() {
    let temp_dir = TempDir::new().unwrap();
    let fs = NativeFileSystem::new(temp_dir.path()).unwrap();

    touch(temp_dir.path().join("a.js"));
    touch(temp_dir.path().join("sub/b.js"));

    let mut names = fs.read_dir(temp_dir.path()).await.unwrap();
    names.sort();
    assert_eq!(names, vec!["a.js", "sub"]);
}

#[tokio::test]
async fn test_native_path_traversal_blocked() {
    let temp_dir = TempDir::new().unwrap();
    let fs = NativeFileSystem::new(temp_dir.path()).unwrap();

    let malicious_paths = vec![
        "../../../etc/passwd",
        "../../.ssh/id_rsa",
        "foo/../../bar/../../baz",
    ];

    for path in malicious_paths {
        let result = fs.read_to_string(Path::new(path)).await;
        assert!(result.is_err(), "Path traversal not blocked: {}", path);

        if let Err(e) = result {
            assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied);
        }
    }
}

#[tokio::test]
async fn test_scan_nested_and_sorted() {
    let temp_dir = TempDir::new().unwrap();
    let pages = temp_dir.path().join("pages");
    touch(pages.join("index.js"));
    touch(pages.join("about.tsx"));
    touch(pages.join("blog/[slug].js"));
    touch(pages.join("blog/index.js"));
    touch(pages.join("styles.css"));

    let fs = NativeFileSystem::new(temp_dir.path()).unwrap();
    let found = scan(&fs, &[pages], &js_filter(), None).await.unwrap();

    assert_eq!(
        found,
        vec!["/about.tsx", "/blog/[slug].js", "/blog/index.js", "/index.js"]
    );
}

#[tokio::test]
async fn test_scan_first_root_shadows_later_roots() {
    let temp_dir = TempDir::new().unwrap();
    let primary = temp_dir.path().join("primary");
    let fallback = temp_dir.path().join("fallback");

    touch(primary.join("index.js"));
    touch(primary.join("docs/intro.js"));
    touch(fallback.join("index.js"));
    touch(fallback.join("_error.js"));
    // The whole `docs` directory of the fallback is shadowed.
    touch(fallback.join("docs/hidden.js"));

    let fs = NativeFileSystem::new(temp_dir.path()).unwrap();
    let found = scan(&fs, &[primary, fallback], &js_filter(), None)
        .await
        .unwrap();

    assert_eq!(found, vec!["/_error.js", "/docs/intro.js", "/index.js"]);
}

#[tokio::test]
async fn test_scan_ignore_keeps_matching_top_level_entries() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("src");
    touch(root.join("pages/index.js"));
    touch(root.join("pages/internal/tool.js"));
    touch(root.join("scripts/build.js"));
    touch(root.join("main.js"));

    let fs = NativeFileSystem::new(temp_dir.path()).unwrap();
    let ignore = Regex::new("^pages$").unwrap();
    let found = scan(&fs, &[root], &js_filter(), Some(&ignore))
        .await
        .unwrap();

    // Only the top level is filtered; `internal` survives below `pages`.
    assert_eq!(found, vec!["/pages/index.js", "/pages/internal/tool.js"]);
}

#[tokio::test]
async fn test_scan_missing_root_aborts() {
    let temp_dir = TempDir::new().unwrap();
    let present = temp_dir.path().join("pages");
    touch(present.join("index.js"));
    let missing = temp_dir.path().join("does-not-exist");

    let fs = NativeFileSystem::new(temp_dir.path()).unwrap();
    let err = scan(&fs, &[present, missing.clone()], &js_filter(), None)
        .await
        .unwrap_err();

    assert_eq!(err.source.kind(), std::io::ErrorKind::NotFound);
    assert!(err.path.ends_with("does-not-exist"));
}

#[cfg(feature = "memory")]
mod memory_tests {
    use super::*;
    use pagemeter_fs::MemoryFileSystem;

    #[tokio::test]
    async fn test_memory_scan_overlay() {
        let fs = MemoryFileSystem::empty("/app").unwrap();
        fs.add_file("/app/pages/index.js", "a").unwrap();
        fs.add_file("/app/pages/post/[id].js", "b").unwrap();
        fs.add_file("/app/defaults/index.js", "c").unwrap();
        fs.add_file("/app/defaults/_app.js", "d").unwrap();

        let roots = [PathBuf::from("/app/pages"), PathBuf::from("/app/defaults")];
        let found = scan(&fs, &roots, &js_filter(), None).await.unwrap();

        assert_eq!(found, vec!["/_app.js", "/index.js", "/post/[id].js"]);
    }
}
