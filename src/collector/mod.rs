//! 파일 수집 모듈
//!
//! 로컬 파일 및 폴더에서 인덱싱할 텍스트 파일을 모읍니다.
//! .gitignore 패턴을 존중하고, 지원하는 확장자만 수집합니다.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;

/// 텍스트로 읽을 수 있는 확장자
const TEXT_EXTENSIONS: &[&str] = &[
    "md", "txt", "rst", "adoc", "rs", "ts", "tsx", "js", "jsx", "py", "json", "toml", "yaml",
    "yml", "html", "css", "go", "java", "c", "cpp", "h", "hpp", "sh", "sql", "xml", "csv",
];

/// 확장자가 지원 대상인지 확인
pub fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| TEXT_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

// ============================================================================
// Collected File
// ============================================================================

/// 수집된 파일
#[derive(Debug, Clone)]
pub struct CollectedFile {
    /// 파일 경로
    pub path: PathBuf,
    /// 출처 ID (수집 루트 기준 상대 경로)
    pub source_id: String,
    /// 파일 내용
    pub content: String,
}

// ============================================================================
// File Collector
// ============================================================================

/// 파일 수집기 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// .gitignore 패턴 존중 여부
    pub respect_gitignore: bool,
    /// 숨김 파일 포함 여부
    pub include_hidden: bool,
    /// 최대 파일 크기 (바이트, 0이면 제한 없음)
    pub max_file_size: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            respect_gitignore: true,
            include_hidden: false,
            max_file_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// 파일 수집기
pub struct FileCollector {
    config: CollectorConfig,
}

impl FileCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(CollectorConfig::default())
    }

    /// 단일 파일 수집 (출처 ID는 주어진 경로, 구분자는 `/`)
    pub fn collect_file(&self, path: &Path) -> Result<CollectedFile> {
        if !path.is_file() {
            anyhow::bail!("Not a file: {:?}", path);
        }

        let source_id = normalize_source_id(path);

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {:?}", path))?;

        Ok(CollectedFile {
            path: path.to_path_buf(),
            source_id,
            content,
        })
    }

    /// 폴더 재귀 수집 (경로 순 정렬)
    pub fn collect_directory(&self, path: &Path) -> Result<Vec<CollectedFile>> {
        if !path.is_dir() {
            anyhow::bail!("Not a directory: {:?}", path);
        }

        let mut files = Vec::new();

        // ignore 크레이트로 .gitignore 지원
        let walker = WalkBuilder::new(path)
            .hidden(!self.config.include_hidden)
            .git_ignore(self.config.respect_gitignore)
            .git_global(self.config.respect_gitignore)
            .git_exclude(self.config.respect_gitignore)
            .sort_by_file_path(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }

            let file_path = entry.path();
            if !self.should_include(file_path) {
                continue;
            }

            match self.collect_file(file_path) {
                Ok(mut file) => {
                    file.source_id =
                        normalize_source_id(file_path.strip_prefix(path).unwrap_or(file_path));
                    files.push(file);
                }
                Err(e) => {
                    tracing::warn!("Failed to collect file: {}", e);
                }
            }
        }

        tracing::info!("Collected {} files from {:?}", files.len(), path);
        Ok(files)
    }

    /// 파일이 필터 조건을 만족하는지 확인
    fn should_include(&self, path: &Path) -> bool {
        if !is_text_file(path) {
            return false;
        }

        if self.config.max_file_size > 0 {
            if let Ok(meta) = std::fs::metadata(path) {
                if meta.len() > self.config.max_file_size {
                    tracing::debug!("Skipping large file: {:?} ({} bytes)", path, meta.len());
                    return false;
                }
            }
        }

        true
    }
}

fn normalize_source_id(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_text_file() {
        assert!(is_text_file(Path::new("notes.md")));
        assert!(is_text_file(Path::new("README.TXT")));
        assert!(!is_text_file(Path::new("image.png")));
        assert!(!is_text_file(Path::new("Makefile")));
    }

    #[test]
    fn test_collector_config_default() {
        let config = CollectorConfig::default();
        assert!(config.respect_gitignore);
        assert!(!config.include_hidden);
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
    }

    #[test]
    fn test_collect_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.md"), "bee").unwrap();
        std::fs::write(dir.path().join("a.txt"), "ay").unwrap();
        std::fs::write(dir.path().join("sub").join("c.md"), "sea").unwrap();
        std::fs::write(dir.path().join("skip.bin"), "nope").unwrap();

        let files = FileCollector::with_defaults()
            .collect_directory(dir.path())
            .unwrap();
        let ids: Vec<&str> = files.iter().map(|f| f.source_id.as_str()).collect();

        assert_eq!(ids, vec!["a.txt", "b.md", "sub/c.md"]);
        assert_eq!(files[1].content, "bee");
    }

    #[test]
    fn test_collect_file_keeps_given_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();
        let first = dir.path().join("a").join("README.md");
        let second = dir.path().join("b").join("README.md");
        std::fs::write(&first, "first").unwrap();
        std::fs::write(&second, "second").unwrap();

        let collector = FileCollector::with_defaults();
        let a = collector.collect_file(&first).unwrap();
        let b = collector.collect_file(&second).unwrap();

        assert_ne!(a.source_id, b.source_id);
        assert!(a.source_id.ends_with("a/README.md"));
        assert!(b.source_id.ends_with("b/README.md"));
    }

    #[test]
    fn test_collect_file_missing() {
        let result = FileCollector::with_defaults().collect_file(Path::new("/nonexistent/x.md"));
        assert!(result.is_err());
    }
}
