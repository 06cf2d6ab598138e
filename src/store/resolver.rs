//! Layered definition resolution
//!
//! Merges the Package, Override and Extra/Custom layers into one
//! authoritative table per kind, and attaches the Deprecated advisory
//! list. Precedence per ID and architecture:
//!
//!   Custom(Extra) > Override-modified-Package > Package
//!
//! The catalogue is walked in document order. An Override value is
//! substituted before an entry is stored; Custom entries are overlaid
//! when an architecture section closes, overwriting same-named entries.
//! Layer loading is fail-soft throughout: a broken customer file drops
//! its own entries with a diagnostic and never blocks startup.

use crate::config::StorePaths;
use crate::store::definition::{
    Content, Definition, Kind, Layer, NoteContent, SolutionContent, VersionInfo, SOLUTION_SUFFIX,
};
use crate::store::text::{self, Document};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Resolved Note table (Notes are architecture-neutral; the table is
/// built for the architecture key of the current run)
#[derive(Debug, Clone, Default)]
pub struct ResolvedNotes {
    pub table: BTreeMap<String, Definition>,
}

impl ResolvedNotes {
    pub fn get(&self, id: &str) -> Option<&Definition> {
        self.table.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.table.contains_key(id)
    }
}

/// Resolved per-architecture Solution tables
#[derive(Debug, Clone, Default)]
pub struct ResolvedSolutions {
    pub tables: BTreeMap<String, BTreeMap<String, Definition>>,
    /// Advisory map of deprecated Solution IDs to their notice text
    pub deprecated: BTreeMap<String, String>,
}

impl ResolvedSolutions {
    /// Table for one architecture key
    pub fn for_arch(&self, arch: &str) -> Option<&BTreeMap<String, Definition>> {
        self.tables.get(arch)
    }

    pub fn get(&self, arch: &str, id: &str) -> Option<&Definition> {
        self.tables.get(arch).and_then(|t| t.get(id))
    }

    pub fn is_deprecated(&self, id: &str) -> bool {
        self.deprecated.contains_key(id)
    }

    /// Solutions in one architecture referencing a Note, custom ones
    /// included, in table order
    pub fn referencing_note(&self, arch: &str, note_id: &str) -> Vec<&Definition> {
        self.for_arch(arch)
            .map(|table| {
                table
                    .values()
                    .filter(|def| def.member_notes().iter().any(|n| n == note_id))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Merges definition layers into authoritative tables
#[derive(Debug, Clone)]
pub struct LayerResolver<'a> {
    paths: &'a StorePaths,
    arch: String,
    check_refs: bool,
}

impl<'a> LayerResolver<'a> {
    pub fn new(paths: &'a StorePaths, arch: impl Into<String>) -> Self {
        Self {
            paths,
            arch: arch.into(),
            check_refs: true,
        }
    }

    /// Toggle reference checking for Override/Custom solution entries
    pub fn check_references(mut self, enable: bool) -> Self {
        self.check_refs = enable;
        self
    }

    /// Resolve the Note table: Package notes with Override values
    /// substituted, then Extra notes overlaid
    pub fn resolve_notes(&self) -> ResolvedNotes {
        let mut table = BTreeMap::new();

        for path in list_files(&self.paths.package_notes_dir()) {
            let Some(id) = file_id(&path) else { continue };
            let doc = text::load(&path);
            let mut content = NoteContent::from_document(&doc);
            let version = VersionInfo::from_document(&doc);

            let mut layer = Layer::Package;
            let over = text::load(&self.paths.override_path(Kind::Note, &id));
            if !over.entries.is_empty() && content.apply_override(&over) {
                layer = Layer::Override;
            }

            table.insert(
                id.clone(),
                Definition {
                    id,
                    kind: Kind::Note,
                    arch: self.arch.clone(),
                    content: Content::Note(content),
                    version,
                    source_layer: layer,
                },
            );
        }

        // Customer notes are copied in last and overwrite same-named
        // package entries
        for path in list_files(&self.paths.extra_dir()) {
            let Some(id) = file_id(&path) else { continue };
            if id.ends_with(SOLUTION_SUFFIX) {
                continue;
            }
            let doc = text::load(&path);
            table.insert(
                id.clone(),
                Definition {
                    id,
                    kind: Kind::Note,
                    arch: self.arch.clone(),
                    content: Content::Note(NoteContent::from_document(&doc)),
                    version: VersionInfo::from_document(&doc),
                    source_layer: Layer::Custom,
                },
            );
        }

        ResolvedNotes { table }
    }

    /// Resolve the per-architecture Solution tables from the package
    /// catalogue, the per-ID Override files and the custom catalogue
    pub fn resolve_solutions(&self) -> ResolvedSolutions {
        let catalogue = text::load(&self.paths.package_solutions_file());
        let custom = text::load(&self.paths.extra_solutions_file());
        let catalogue_version = VersionInfo::from_document(&catalogue);
        let custom_version = VersionInfo::from_document(&custom);

        let mut tables: BTreeMap<String, BTreeMap<String, Definition>> = BTreeMap::new();
        let mut current_arch: Option<String> = None;
        let mut current: BTreeMap<String, Definition> = BTreeMap::new();

        for entry in &catalogue.entries {
            if Document::is_metadata_section(&entry.section) {
                continue;
            }

            if current_arch.as_deref() != Some(entry.section.as_str()) {
                if let Some(arch) = current_arch.take() {
                    self.overlay_custom(&custom, &custom_version, &arch, &mut current);
                    tables.entry(arch).or_default().append(&mut current);
                }
                // A reappearing architecture section resumes its table
                current = tables.remove(&entry.section).unwrap_or_default();
                current_arch = Some(entry.section.clone());
            }

            let arch = entry.section.clone();
            let over = text::load(&self.paths.override_path(Kind::Solution, &entry.key));
            let (raw, layer) = match over.get(&arch, &entry.key) {
                Some(value) => (value.to_string(), Layer::Override),
                None => (entry.value.clone(), Layer::Package),
            };

            let content = SolutionContent::parse(&raw);
            if layer == Layer::Override && !self.references_resolve(&entry.key, &content) {
                continue;
            }

            current.insert(
                entry.key.clone(),
                Definition {
                    id: entry.key.clone(),
                    kind: Kind::Solution,
                    arch,
                    content: Content::Solution(content),
                    version: catalogue_version.clone(),
                    source_layer: layer,
                },
            );
        }

        if let Some(arch) = current_arch.take() {
            self.overlay_custom(&custom, &custom_version, &arch, &mut current);
            tables.entry(arch).or_default().append(&mut current);
        }

        // Architectures present only in the custom catalogue
        for section in custom.sections() {
            if Document::is_metadata_section(section) || tables.contains_key(section) {
                continue;
            }
            let mut table = BTreeMap::new();
            self.overlay_custom(&custom, &custom_version, section, &mut table);
            if !table.is_empty() {
                tables.insert(section.to_string(), table);
            }
        }

        ResolvedSolutions {
            tables,
            deprecated: self.load_deprecated(),
        }
    }

    /// Overlay custom catalogue entries for one architecture, overwriting
    /// same-named Package/Override entries
    fn overlay_custom(
        &self,
        custom: &Document,
        version: &VersionInfo,
        arch: &str,
        table: &mut BTreeMap<String, Definition>,
    ) {
        for entry in custom.section_entries(arch) {
            let content = SolutionContent::parse(&entry.value);
            if !self.references_resolve(&entry.key, &content) {
                continue;
            }
            table.insert(
                entry.key.clone(),
                Definition {
                    id: entry.key.clone(),
                    kind: Kind::Solution,
                    arch: arch.to_string(),
                    content: Content::Solution(content),
                    version: version.clone(),
                    source_layer: Layer::Custom,
                },
            );
        }
    }

    /// Reference check for Override/Custom solution entries: every member
    /// Note must resolve in Working or Extra. Failing entries are dropped
    /// fail-soft with a diagnostic.
    fn references_resolve(&self, id: &str, content: &SolutionContent) -> bool {
        if !self.check_refs {
            return true;
        }
        for note in &content.notes {
            let in_working = self.paths.working_path(Kind::Note, note).exists();
            let in_extra = self.paths.extra_note_path(note).exists();
            if !in_working && !in_extra {
                tracing::warn!(
                    "dropping solution '{}': member note '{}' does not resolve in working or extra",
                    id,
                    note
                );
                return false;
            }
        }
        true
    }

    fn load_deprecated(&self) -> BTreeMap<String, String> {
        let doc = text::load(&self.paths.deprecated_solutions_file());
        doc.entries
            .iter()
            .filter(|e| !Document::is_metadata_section(&e.section))
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect()
    }
}

/// Regular files directly inside a directory, sorted by name. A missing
/// directory yields an empty list (fail-soft for layer merging).
pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) if e.file_type().is_file() => Some(e.into_path()),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("cannot list entry under {}: {}", dir.display(), e);
                None
            }
        })
        .collect()
}

fn file_id(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Build the standard backing-store tree under a temp root
    fn fixture() -> (TempDir, StorePaths) {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::under_root(dir.path());
        for d in [
            paths.package_notes_dir(),
            paths.working_notes_dir(),
            paths.working_sols_dir(),
            paths.staging_dir(),
            paths.override_dir(),
            paths.extra_dir(),
        ] {
            fs::create_dir_all(d).unwrap();
        }
        fs::create_dir_all(paths.deprecated_solutions_file().parent().unwrap()).unwrap();
        (dir, paths)
    }

    fn write(path: &Path, text: &str) {
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_override_substitutes_note_value() {
        let (_dir, paths) = fixture();
        write(
            &paths.package_notes_dir().join("N3"),
            "[version]\nVERSION = 1\n[sysctl]\nX = 1\n",
        );
        write(&paths.override_path(Kind::Note, "N3"), "[sysctl]\nX = 2\n");

        let notes = LayerResolver::new(&paths, "ArchX86").resolve_notes();
        let def = notes.get("N3").unwrap();
        assert_eq!(def.source_layer, Layer::Override);
        match &def.content {
            Content::Note(c) => assert_eq!(c.params[0].2, "2"),
            other => panic!("expected note content, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_note_overwrites_package() {
        let (_dir, paths) = fixture();
        write(&paths.package_notes_dir().join("N1"), "[sysctl]\nX = 1\n");
        write(&paths.extra_note_path("N1"), "[sysctl]\nX = 7\n");

        let notes = LayerResolver::new(&paths, "ArchX86").resolve_notes();
        let def = notes.get("N1").unwrap();
        assert_eq!(def.source_layer, Layer::Custom);
    }

    #[test]
    fn test_custom_solution_wins_over_package() {
        let (_dir, paths) = fixture();
        write(&paths.working_notes_dir().join("N1"), "[sysctl]\nX = 1\n");
        write(&paths.working_notes_dir().join("N9"), "[sysctl]\nX = 9\n");
        write(
            &paths.package_solutions_file(),
            "[ArchX86]\nS9 = N1\nS2 = N1\n",
        );
        write(&paths.extra_solutions_file(), "[ArchX86]\nS9 = N9\n");

        let sols = LayerResolver::new(&paths, "ArchX86").resolve_solutions();
        let def = sols.get("ArchX86", "S9").unwrap();
        assert_eq!(def.source_layer, Layer::Custom);
        assert_eq!(def.member_notes(), ["N9".to_string()]);
        // Untouched package entry survives
        assert_eq!(
            sols.get("ArchX86", "S2").unwrap().source_layer,
            Layer::Package
        );
    }

    #[test]
    fn test_solution_override_substitutes_member_list() {
        let (_dir, paths) = fixture();
        write(&paths.working_notes_dir().join("N1"), "[sysctl]\nX = 1\n");
        write(&paths.working_notes_dir().join("N4"), "[sysctl]\nX = 4\n");
        write(&paths.package_solutions_file(), "[ArchX86]\nS1 = N1 N2\n");
        write(
            &paths.override_path(Kind::Solution, "S1"),
            "[ArchX86]\nS1 = N1 N4\n",
        );

        let sols = LayerResolver::new(&paths, "ArchX86").resolve_solutions();
        let def = sols.get("ArchX86", "S1").unwrap();
        assert_eq!(def.source_layer, Layer::Override);
        assert_eq!(def.member_notes(), ["N1".to_string(), "N4".to_string()]);
    }

    #[test]
    fn test_broken_reference_drops_entry_fail_soft() {
        let (_dir, paths) = fixture();
        write(&paths.working_notes_dir().join("N1"), "[sysctl]\nX = 1\n");
        write(&paths.package_solutions_file(), "[ArchX86]\nS1 = N1\n");
        // Custom solution referencing a note that exists nowhere
        write(&paths.extra_solutions_file(), "[ArchX86]\nS8 = NOPE\n");

        let sols = LayerResolver::new(&paths, "ArchX86").resolve_solutions();
        assert!(sols.get("ArchX86", "S8").is_none());
        assert!(sols.get("ArchX86", "S1").is_some());
    }

    #[test]
    fn test_reference_check_can_be_disabled() {
        let (_dir, paths) = fixture();
        write(&paths.extra_solutions_file(), "[ArchX86]\nS8 = NOPE\n");

        let sols = LayerResolver::new(&paths, "ArchX86")
            .check_references(false)
            .resolve_solutions();
        assert!(sols.get("ArchX86", "S8").is_some());
    }

    #[test]
    fn test_per_arch_tables_are_separate() {
        let (_dir, paths) = fixture();
        write(
            &paths.package_solutions_file(),
            "[version]\nVERSION = 5\n[ArchX86]\nS1 = N1\n[ArchPPC64LE]\nS1 = N2\n",
        );

        let sols = LayerResolver::new(&paths, "ArchX86")
            .check_references(false)
            .resolve_solutions();
        assert_eq!(
            sols.get("ArchX86", "S1").unwrap().member_notes(),
            ["N1".to_string()]
        );
        assert_eq!(
            sols.get("ArchPPC64LE", "S1").unwrap().member_notes(),
            ["N2".to_string()]
        );
        assert_eq!(sols.get("ArchX86", "S1").unwrap().version.version, "5");
    }

    #[test]
    fn test_referencing_note_includes_custom() {
        let (_dir, paths) = fixture();
        write(&paths.package_solutions_file(), "[ArchX86]\nS1 = N1 N2\n");
        write(&paths.extra_solutions_file(), "[ArchX86]\nS9 = N2\n");

        let sols = LayerResolver::new(&paths, "ArchX86")
            .check_references(false)
            .resolve_solutions();
        let refs: Vec<&str> = sols
            .referencing_note("ArchX86", "N2")
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(refs, vec!["S1", "S9"]);
    }

    #[test]
    fn test_deprecated_advisory_list() {
        let (_dir, paths) = fixture();
        write(
            &paths.deprecated_solutions_file(),
            "[ArchX86]\nOLDSOL = superseded by NEWSOL\n",
        );

        let sols = LayerResolver::new(&paths, "ArchX86").resolve_solutions();
        assert!(sols.is_deprecated("OLDSOL"));
        assert_eq!(
            sols.deprecated.get("OLDSOL").map(String::as_str),
            Some("superseded by NEWSOL")
        );
    }
}
