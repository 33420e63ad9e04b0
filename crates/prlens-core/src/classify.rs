//! File classification: language detection and the config/docs/test/source/
//! binary buckets used by both the forge client's content-fetch policy
//! (spec §4.1) and the enrichment engine's per-file classification
//! (spec §4.3).

/// Extensions the forge client never fetches content for (spec §4.1).
const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "bin", "dat", "zip", "tar", "gz", "rar", "7z", "png", "jpg",
    "jpeg", "gif", "bmp", "ico", "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "mp3", "mp4",
    "avi", "mov",
];

const CONFIG_EXTENSIONS: &[&str] = &["json", "yaml", "yml", "toml", "ini", "cfg", "conf", "env"];
const CONFIG_BASENAMES: &[&str] = &[
    "dockerfile",
    "makefile",
    "docker-compose.yml",
    "docker-compose.yaml",
    ".gitignore",
    ".dockerignore",
    ".editorconfig",
];

const DOC_EXTENSIONS: &[&str] = &["md", "rst", "txt", "adoc"];
const DOC_BASENAMES: &[&str] = &["readme", "changelog", "license", "notice", "contributing"];

const TEST_MARKERS: &[&str] = &["test", "tests", "spec", "__tests__", "specs"];

/// Maps a file extension to a human-readable language name.
fn language_for_extension(ext: &str) -> &'static str {
    match ext {
        "rs" => "Rust",
        "py" => "Python",
        "js" => "JavaScript",
        "jsx" => "JavaScript",
        "ts" => "TypeScript",
        "tsx" => "TypeScript",
        "go" => "Go",
        "java" => "Java",
        "kt" | "kts" => "Kotlin",
        "rb" => "Ruby",
        "php" => "PHP",
        "c" => "C",
        "h" => "C",
        "cc" | "cpp" | "cxx" | "hpp" => "C++",
        "cs" => "C#",
        "swift" => "Swift",
        "scala" => "Scala",
        "sh" | "bash" => "Shell",
        "sql" => "SQL",
        "html" | "htm" => "HTML",
        "css" | "scss" | "less" => "CSS",
        "md" | "rst" | "txt" | "adoc" => "Documentation",
        "json" | "yaml" | "yml" | "toml" | "ini" | "cfg" | "conf" => "Configuration",
        _ => "Other",
    }
}

fn extension_of(path: &str) -> Option<String> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

fn basename_of(path: &str) -> String {
    path.rsplit('/')
        .next()
        .unwrap_or(path)
        .to_ascii_lowercase()
}

/// Binary-content policy from spec §4.1: extension-based, never content-sniffed.
pub fn is_binary_path(path: &str) -> bool {
    extension_of(path)
        .map(|ext| BINARY_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

pub fn language_for_path(path: &str) -> String {
    extension_of(path)
        .map(|ext| language_for_extension(&ext).to_string())
        .unwrap_or_else(|| "Other".to_string())
}

pub fn is_config_file(path: &str) -> bool {
    let base = basename_of(path);
    if CONFIG_BASENAMES.iter().any(|b| base == *b || base.starts_with(b)) {
        return true;
    }
    path.contains("config") || path.contains(".github/workflows")
        || extension_of(path)
            .map(|ext| CONFIG_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
}

pub fn is_documentation(path: &str) -> bool {
    let base = basename_of(path);
    if DOC_BASENAMES.iter().any(|b| base.starts_with(b)) {
        return true;
    }
    if path.starts_with("docs/") || path.contains("/docs/") {
        return true;
    }
    extension_of(path)
        .map(|ext| DOC_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

pub fn is_test_file(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    let base = basename_of(&lower);
    TEST_MARKERS.iter().any(|marker| {
        lower.contains(&format!("/{marker}/"))
            || lower.starts_with(&format!("{marker}/"))
            || base.contains(&format!("_{marker}"))
            || base.contains(&format!("{marker}_"))
            || base.contains(&format!(".{marker}."))
    })
}

/// A file is source code iff it isn't classified as anything else and carries
/// a recognized code extension (spec §4.3 classification bucket).
pub fn is_source_code(path: &str, is_binary: bool, is_config: bool, is_doc: bool, is_test: bool) -> bool {
    if is_binary || is_config || is_doc || is_test {
        return false;
    }
    !matches!(language_for_path(path).as_str(), "Other" | "Configuration" | "Documentation")
}

/// The full classification bundle for one file path, computed once and
/// reused by both the forge client (binary policy) and the enrichment
/// engine (per-file flags in VS-File).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileClassification {
    pub language: String,
    pub is_binary: bool,
    pub is_config_file: bool,
    pub is_documentation: bool,
    pub is_test_file: bool,
    pub is_source_code: bool,
}

pub fn classify_file(path: &str) -> FileClassification {
    let is_binary = is_binary_path(path);
    let is_config_file = !is_binary && is_config_file(path);
    let is_documentation = !is_binary && !is_config_file && is_documentation(path);
    let is_test_file = !is_binary && is_test_file(path);
    let is_source_code = is_source_code(path, is_binary, is_config_file, is_documentation, is_test_file);
    FileClassification {
        language: language_for_path(path),
        is_binary,
        is_config_file,
        is_documentation,
        is_test_file,
        is_source_code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_extensions_never_fetched() {
        assert!(is_binary_path("assets/logo.png"));
        assert!(is_binary_path("bin/tool.exe"));
        assert!(!is_binary_path("src/main.rs"));
    }

    #[test]
    fn documentation_only_change() {
        let c = classify_file("README.md");
        assert!(c.is_documentation);
        assert!(!c.is_source_code);
    }

    #[test]
    fn test_file_detection() {
        assert!(is_test_file("tests/integration_test.rs"));
        assert!(is_test_file("src/foo_test.py"));
        assert!(is_test_file("src/__tests__/bar.spec.ts"));
        assert!(!is_test_file("src/lib.rs"));
    }

    #[test]
    fn config_file_detection() {
        assert!(is_config_file("Dockerfile"));
        assert!(is_config_file("config/app.yaml"));
        assert!(is_config_file(".github/workflows/ci.yml"));
    }

    #[test]
    fn source_code_excludes_other_buckets() {
        let c = classify_file("src/handlers/user.py");
        assert!(c.is_source_code);
        assert_eq!(c.language, "Python");

        let c = classify_file("package.json");
        assert!(!c.is_source_code);
        assert!(c.is_config_file);
    }
}
