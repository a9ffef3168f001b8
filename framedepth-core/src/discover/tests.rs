//! Tests for source file discovery

#[cfg(test)]
mod discover_tests {
    use crate::discover::{
        collect_python_files, collect_python_files_recursive, relative_path, Selection,
        SourceFilter,
    };
    use globset::{Glob, GlobSetBuilder};
    use std::fs;
    use std::path::{Path, PathBuf};

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x = 1\n").unwrap();
    }

    fn relatives(filter: &SourceFilter, root: &Path, selection: Selection) -> Vec<String> {
        filter
            .discover(root, selection)
            .unwrap()
            .into_iter()
            .map(|f| f.relative.to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_test_file_rule() {
        let filter = SourceFilter::default();
        assert!(filter.is_test_file(Path::new("project/tests/test_foo.py")));
        assert!(filter.is_test_file(Path::new("test/helpers.py")));
        assert!(filter.is_test_file(Path::new("test_bar.py")));
        assert!(filter.is_test_file(Path::new("pkg/bar_test.py")));
        assert!(!filter.is_test_file(Path::new("pkg/testing.py")));
        assert!(!filter.is_test_file(Path::new("pkg/contest.py")));
        assert!(!filter.is_test_file(Path::new("testdata/loader.py")));
    }

    #[test]
    fn test_venv_rule() {
        let filter = SourceFilter::default();
        assert!(filter.is_venv_file(Path::new("venv/lib/site.py")));
        assert!(filter.is_venv_file(Path::new("a/venv/b.py")));
        assert!(!filter.is_venv_file(Path::new("venvs/b.py")));
        assert!(!filter.is_venv_file(Path::new(".venv/b.py")));

        let custom = SourceFilter::new(".venv");
        assert!(custom.is_venv_file(Path::new(".venv/b.py")));
        assert_eq!(custom.venv_dir(), ".venv");
    }

    #[test]
    fn test_selection_is_complementary_except_venv() {
        let filter = SourceFilter::default();
        let test_file = Path::new("tests/test_x.py");
        let source = Path::new("pkg/x.py");
        let venv_test = Path::new("venv/tests/test_y.py");

        assert!(filter.selects(source, Selection::Sources));
        assert!(!filter.selects(source, Selection::Tests));
        assert!(filter.selects(test_file, Selection::Tests));
        assert!(!filter.selects(test_file, Selection::Sources));
        assert!(!filter.selects(venv_test, Selection::Tests));
        assert!(!filter.selects(venv_test, Selection::Sources));
    }

    #[test]
    fn test_discover_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "pkg/zeta.py");
        touch(root, "pkg/alpha.py");
        touch(root, "main.py");
        touch(root, "pkg/notes.txt");
        touch(root, "tests/test_alpha.py");
        touch(root, "pkg/alpha_test.py");
        touch(root, "venv/lib/site.py");

        let filter = SourceFilter::default();
        assert_eq!(
            relatives(&filter, root, Selection::Sources),
            ["main.py", "pkg/alpha.py", "pkg/zeta.py"]
        );
        assert_eq!(
            relatives(&filter, root, Selection::Tests),
            ["pkg/alpha_test.py", "tests/test_alpha.py"]
        );
    }

    #[test]
    fn test_root_under_tests_directory_is_still_analysed() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("tests").join("fixture_pkg");
        touch(&root, "mod.py");

        let filter = SourceFilter::default();
        assert_eq!(relatives(&filter, &root, Selection::Sources), ["mod.py"]);
    }

    #[test]
    fn test_single_file_root() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "solo.py");
        let file = dir.path().join("solo.py");

        let files = collect_python_files(&file, "venv").unwrap();
        assert_eq!(files, vec![file.clone()]);
        assert_eq!(relative_path(&file, &file), PathBuf::from("solo.py"));
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_python_files(&dir.path().join("absent"), "venv").is_err());
    }

    #[test]
    fn test_unreadable_subdirectory_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not_a_dir.py");
        fs::write(&file, "x = 1\n").unwrap();

        // read_dir on a file fails; below the root that is logged, not raised
        let mut files = Vec::new();
        collect_python_files_recursive(&file, "venv", &mut files);
        assert!(files.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_locked_directory_does_not_hide_siblings() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "ok.py");
        touch(root, "locked/hidden.py");
        let locked = root.join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let result = collect_python_files(root, "venv");
        let still_readable = fs::read_dir(&locked).is_ok();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let files = result.unwrap();
        assert!(files.contains(&root.join("ok.py")));
        if !still_readable {
            // privileged users can read the directory anyway
            assert_eq!(files, vec![root.join("ok.py")]);
        }
    }

    #[test]
    fn test_user_globs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "pkg/a.py");
        touch(root, "pkg/generated/b.py");
        touch(root, "scripts/c.py");

        let mut include = GlobSetBuilder::new();
        include.add(Glob::new("pkg/**").unwrap());
        let mut exclude = GlobSetBuilder::new();
        exclude.add(Glob::new("**/generated/**").unwrap());
        let filter = SourceFilter::default()
            .with_globs(Some(include.build().unwrap()), Some(exclude.build().unwrap()));

        assert_eq!(relatives(&filter, root, Selection::Sources), ["pkg/a.py"]);
    }
}
