use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::language_utils;
use crate::resources::ResourceDocument;

// @module: File and directory utilities

/// Default resource file name inside a `values*` directory
pub const STRINGS_FILE: &str = "strings.xml";

/// A `strings.xml` found under a resource directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleResource {
    /// Locale of the directory, `None` for the default `values`
    pub locale: Option<String>,
    pub path: PathBuf,
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @generates: Output path beside the input file
    // @params: input_file, target_language, transliterate
    pub fn output_path_beside<P: AsRef<Path>>(input_file: P, target_language: &str, transliterate: bool) -> PathBuf {
        let input_file = input_file.as_ref();
        let dir = input_file.parent().unwrap_or_else(|| Path::new("."));

        let output_filename = if transliterate {
            format!("strings-translit-{}.xml", target_language)
        } else {
            format!("strings-{}.xml", target_language)
        };
        dir.join(output_filename)
    }

    // @generates: `values-<qualifier>/strings.xml` under a resource directory
    pub fn values_output_path<P: AsRef<Path>>(res_dir: P, target_language: &str) -> Result<PathBuf> {
        let values_dir = language_utils::values_dir_for(target_language)?;
        Ok(res_dir.as_ref().join(values_dir).join(STRINGS_FILE))
    }

    /// Find `values*/strings.xml` files directly under a resource directory
    ///
    /// Non-locale qualifiers such as `values-night` are skipped.
    pub fn find_locale_resources<P: AsRef<Path>>(res_dir: P) -> Result<Vec<LocaleResource>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(res_dir.as_ref()).min_depth(2).max_depth(2).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            if !path.is_file() || entry.file_name() != STRINGS_FILE {
                continue;
            }

            let Some(dir_name) = path.parent().and_then(Path::file_name).map(|n| n.to_string_lossy()) else {
                continue;
            };
            let locale = if dir_name == "values" {
                None
            } else {
                match language_utils::locale_from_values_dir(&dir_name) {
                    Some(locale) => Some(locale),
                    None => continue,
                }
            };

            result.push(LocaleResource {
                locale,
                path: path.to_path_buf(),
            });
        }

        result.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(result)
    }

    /// Read and parse a resource document
    pub fn read_document<P: AsRef<Path>>(path: P) -> Result<ResourceDocument> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Failed to read file: {:?}", path))?;
        ResourceDocument::parse(&bytes).with_context(|| format!("Failed to parse resource file: {:?}", path))
    }

    /// Write bytes through a temporary file in the target directory, then rename
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        Self::ensure_dir(parent)?;

        let mut temp = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temporary file in {:?}", parent))?;
        temp.write_all(content)
            .with_context(|| format!("Failed to write to temporary file for {:?}", path))?;
        temp.flush()?;
        temp.persist(path)
            .with_context(|| format!("Failed to write to file: {:?}", path))?;
        Ok(())
    }
}
