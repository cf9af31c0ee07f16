use std::io;
use std::path::Path;

/// Reads shader source text.
pub trait SourceLoader {
    fn load_text(&self, path: &Path) -> io::Result<String>;
}

/// Loads sources from the filesystem, whole-file, as UTF-8.
#[derive(Debug, Default, Copy, Clone)]
pub struct FsSource;

impl SourceLoader for FsSource {
    fn load_text(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_source_reports_missing_file() {
        let err = FsSource
            .load_text(Path::new("definitely/not/here.wgsl"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn fs_source_reads_whole_file() {
        let path = std::env::temp_dir().join(format!("prism-source-{}.wgsl", std::process::id()));
        std::fs::write(&path, "@vertex fn vs_main() {}\n// tail\n").unwrap();
        let text = FsSource.load_text(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(text.ends_with("// tail\n"));
    }
}
