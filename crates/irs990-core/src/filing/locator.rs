//! Filing storage locations.
//!
//! Filings are stored either as loose documents in per-year directories or
//! as members of bulk zip archives. A [`LocationResolver`] maps each filing
//! year to an ordered list of [`Location`]s; earlier locations take
//! precedence when a document exists in more than one.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::document::decode;
use crate::error::FilingError;
use crate::filing::index::object_year;

/// Raw text of one filing and where it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingSource {
    /// Object identifier of the filing.
    pub object_id: String,
    /// Human-readable origin, e.g. `archive.zip:member.xml` or a file path.
    pub origin: String,
    /// Document text, decoded and without a byte-order mark.
    pub text: String,
}

struct OpenArchive {
    path: PathBuf,
    zip: ZipArchive<File>,
}

/// A group of zip archives searched as one, keyed by member file name.
///
/// When several archives hold a member with the same file name, the archive
/// registered first wins.
pub struct ArchiveSet {
    archives: Vec<OpenArchive>,
    members: HashMap<String, (usize, String)>,
    order: Vec<String>,
}

impl ArchiveSet {
    /// Open archives in the given order and index their members.
    pub fn open<I, P>(paths: I) -> Result<Self, FilingError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut set = Self {
            archives: Vec::new(),
            members: HashMap::new(),
            order: Vec::new(),
        };

        for path in paths {
            set.register(path.as_ref())?;
        }
        Ok(set)
    }

    fn register(&mut self, path: &Path) -> Result<(), FilingError> {
        let archive_error = |source| FilingError::Archive {
            archive: path.display().to_string(),
            source,
        };

        let file = File::open(path).map_err(|source| FilingError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let zip = ZipArchive::new(file).map_err(archive_error)?;
        let slot = self.archives.len();

        let mut added = 0usize;
        for member in zip.file_names() {
            if member.ends_with('/') {
                continue;
            }
            let file_name = member.rsplit('/').next().unwrap_or(member);
            if let Some((first, kept)) = self.members.get(file_name) {
                // The archive being registered is not in `archives` yet.
                let owner = match self.archives.get(*first) {
                    Some(archive) => archive.path.as_path(),
                    None => path,
                };
                debug!(
                    "Member {} of {} shadowed by {}:{}",
                    member,
                    path.display(),
                    owner.display(),
                    kept
                );
                continue;
            }
            self.members
                .insert(file_name.to_string(), (slot, member.to_string()));
            self.order.push(file_name.to_string());
            added += 1;
        }

        debug!("Registered archive {} ({} members)", path.display(), added);
        self.archives.push(OpenArchive {
            path: path.to_path_buf(),
            zip,
        });
        Ok(())
    }

    /// Paths of the archives, in precedence order.
    pub fn archives(&self) -> impl Iterator<Item = &Path> {
        self.archives.iter().map(|a| a.path.as_path())
    }

    /// Member file names, in registration order.
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Whether a member with this file name exists.
    pub fn contains(&self, file_name: &str) -> bool {
        self.members.contains_key(file_name)
    }

    /// Number of distinct member file names.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the set holds no members.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Read a member by file name.
    pub fn read(&mut self, file_name: &str) -> Result<Option<(String, Vec<u8>)>, FilingError> {
        let Some((slot, member)) = self.members.get(file_name) else {
            return Ok(None);
        };
        let archive = &mut self.archives[*slot];
        let origin = format!("{}:{}", archive.path.display(), member);

        let mut entry = archive
            .zip
            .by_name(member)
            .map_err(|source| FilingError::Archive {
                archive: archive.path.display().to_string(),
                source,
            })?;
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|source| FilingError::Io {
                path: origin.clone(),
                source,
            })?;

        Ok(Some((origin, bytes)))
    }
}

impl std::fmt::Debug for ArchiveSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveSet")
            .field("archives", &self.archives().collect::<Vec<_>>())
            .field("members", &self.order.len())
            .finish()
    }
}

/// One place filings of a year may be stored.
#[derive(Debug)]
pub enum Location {
    /// A directory of loose documents.
    Directory(PathBuf),
    /// A set of zip archives.
    Archives(ArchiveSet),
}

impl Location {
    fn read(&mut self, file_name: &str) -> Result<Option<(String, Vec<u8>)>, FilingError> {
        match self {
            Location::Directory(dir) => {
                let path = dir.join(file_name);
                match fs::read(&path) {
                    Ok(bytes) => Ok(Some((path.display().to_string(), bytes))),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                    Err(source) => Err(FilingError::Io {
                        path: path.display().to_string(),
                        source,
                    }),
                }
            }
            Location::Archives(set) => set.read(file_name),
        }
    }

    fn document_names(&self, suffix: &str) -> Result<Vec<String>, FilingError> {
        match self {
            Location::Directory(dir) => {
                let mut names = list_dir(dir)?
                    .into_iter()
                    .filter(|p| p.is_file())
                    .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
                    .filter(|name| name.ends_with(suffix))
                    .collect::<Vec<_>>();
                names.sort();
                Ok(names)
            }
            Location::Archives(set) => Ok(set
                .members()
                .filter(|name| name.ends_with(suffix))
                .map(str::to_string)
                .collect()),
        }
    }
}

/// Maps filing years to the locations that store them.
#[derive(Debug)]
pub struct LocationResolver {
    years: BTreeMap<String, Vec<Location>>,
    document_suffix: String,
}

impl LocationResolver {
    /// Create an empty resolver naming documents `<object_id><suffix>`.
    pub fn new(document_suffix: impl Into<String>) -> Self {
        Self {
            years: BTreeMap::new(),
            document_suffix: document_suffix.into(),
        }
    }

    /// Append a location for a year, after any already registered.
    pub fn add(&mut self, year: impl Into<String>, location: Location) {
        self.years.entry(year.into()).or_default().push(location);
    }

    /// Build a resolver from a tree of `<year>/<subdirectory>/` folders.
    ///
    /// Each four-digit year directory contributes its subdirectories, in
    /// name order; loose documents directly under the year directory are
    /// found too.
    pub fn from_directory_tree(root: &Path, document_suffix: &str) -> Result<Self, FilingError> {
        let mut resolver = Self::new(document_suffix);

        for year_dir in list_dir(root)? {
            let Some(year) = year_name(&year_dir) else {
                continue;
            };
            if !year_dir.is_dir() {
                continue;
            }

            let mut subdirs = list_dir(&year_dir)?
                .into_iter()
                .filter(|p| p.is_dir())
                .collect::<Vec<_>>();
            subdirs.sort();

            for dir in subdirs {
                resolver.add(year.clone(), Location::Directory(dir));
            }
            resolver.add(year, Location::Directory(year_dir));
        }

        debug!(
            "Resolved {} year(s) under {}",
            resolver.years.len(),
            root.display()
        );
        Ok(resolver)
    }

    /// Build a resolver from a directory of current archives and an optional
    /// directory of prior (superseded) archives.
    ///
    /// Archives are grouped by the four-digit year their file name starts
    /// with. For each year the current archives are searched before the
    /// prior ones, so a filing present in both resolves to the current copy.
    pub fn from_archive_dirs(
        current: &Path,
        prior: Option<&Path>,
        document_suffix: &str,
    ) -> Result<Self, FilingError> {
        let mut resolver = Self::new(document_suffix);

        let mut dirs = vec![current];
        dirs.extend(prior);

        for dir in dirs {
            let mut by_year: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
            for path in list_dir(dir)? {
                let is_zip = path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
                if !is_zip {
                    continue;
                }
                match year_name(&path) {
                    Some(year) => by_year.entry(year).or_default().push(path),
                    None => warn!("Skipping archive without a year prefix: {}", path.display()),
                }
            }

            for (year, mut paths) in by_year {
                paths.sort();
                resolver.add(year, Location::Archives(ArchiveSet::open(paths)?));
            }
        }

        Ok(resolver)
    }

    /// Registered years, ascending.
    pub fn years(&self) -> impl Iterator<Item = &str> {
        self.years.keys().map(String::as_str)
    }

    /// Locations registered for a year, in precedence order.
    pub fn locations(&self, year: &str) -> &[Location] {
        self.years.get(year).map(Vec::as_slice).unwrap_or_default()
    }

    /// Read a filing by object id, choosing the year from the id.
    ///
    /// Returns `Ok(None)` when the year is not registered or no location
    /// holds the document.
    pub fn open(&mut self, object_id: &str) -> Result<Option<FilingSource>, FilingError> {
        match object_year(object_id) {
            Some(year) => {
                let year = year.to_string();
                self.open_in(&year, object_id)
            }
            None => {
                debug!("Object id {} has no year prefix", object_id);
                Ok(None)
            }
        }
    }

    /// Read a filing from the locations registered for `year`.
    pub fn open_in(
        &mut self,
        year: &str,
        object_id: &str,
    ) -> Result<Option<FilingSource>, FilingError> {
        let file_name = format!("{}{}", object_id, self.document_suffix);
        let Some(locations) = self.years.get_mut(year) else {
            debug!("No locations registered for year {}", year);
            return Ok(None);
        };

        for location in locations.iter_mut() {
            if let Some((origin, bytes)) = location.read(&file_name)? {
                let text = decode(bytes).map_err(|e| FilingError::Io {
                    path: origin.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
                })?;
                return Ok(Some(FilingSource {
                    object_id: object_id.to_string(),
                    origin,
                    text,
                }));
            }
        }
        Ok(None)
    }

    /// Every stored filing as `(year, object_id)`, years ascending.
    ///
    /// A document present in several locations of the same year is listed
    /// once.
    pub fn inventory(&self) -> Result<Vec<(String, String)>, FilingError> {
        let mut listed = Vec::new();

        for (year, locations) in &self.years {
            let mut seen = std::collections::HashSet::new();
            for location in locations {
                for name in location.document_names(&self.document_suffix)? {
                    let Some(object_id) = name.strip_suffix(self.document_suffix.as_str()) else {
                        continue;
                    };
                    if seen.insert(object_id.to_string()) {
                        listed.push((year.clone(), object_id.to_string()));
                    }
                }
            }
        }

        Ok(listed)
    }
}

fn year_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    object_year(name).map(str::to_string)
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, FilingError> {
    let io_error = |source| FilingError::Io {
        path: dir.display().to_string(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        paths.push(entry.map_err(io_error)?.path());
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, body) in members {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_directory_tree() {
        let root = tempfile::tempdir().unwrap();
        let year = root.path().join("2017");
        fs::create_dir_all(year.join("b")).unwrap();
        fs::create_dir_all(year.join("a")).unwrap();
        fs::create_dir_all(root.path().join("notes")).unwrap();
        fs::write(year.join("b/201731309349300201_public.xml"), "b copy").unwrap();
        fs::write(year.join("a/201731309349300201_public.xml"), "a copy").unwrap();
        fs::write(year.join("201731309349300302_public.xml"), "loose").unwrap();

        let mut resolver =
            LocationResolver::from_directory_tree(root.path(), "_public.xml").unwrap();
        assert_eq!(resolver.years().collect::<Vec<_>>(), vec!["2017"]);
        assert_eq!(resolver.locations("2017").len(), 3);

        let source = resolver.open("201731309349300201").unwrap().unwrap();
        assert_eq!(source.text, "a copy");
        assert!(source.origin.ends_with("a/201731309349300201_public.xml"));

        assert_eq!(resolver.open("201731309349300302").unwrap().unwrap().text, "loose");
        assert_eq!(resolver.open("201731309349300999").unwrap(), None);
        assert_eq!(resolver.open("201531309349300201").unwrap(), None);
        assert_eq!(resolver.open("abc").unwrap(), None);

        assert_eq!(
            resolver.inventory().unwrap(),
            vec![
                ("2017".to_string(), "201731309349300201".to_string()),
                ("2017".to_string(), "201731309349300302".to_string()),
            ]
        );
    }

    #[test]
    fn test_current_archives_before_prior() {
        let current = tempfile::tempdir().unwrap();
        let prior = tempfile::tempdir().unwrap();

        write_zip(
            &current.path().join("2019_TEOS_XML_01A.zip"),
            &[("2019_TEOS_XML_01A/201900001_public.xml", "current")],
        );
        write_zip(
            &prior.path().join("2019_TEOS_XML_01A.zip"),
            &[
                ("201900001_public.xml", "prior"),
                ("201900002_public.xml", "prior only"),
            ],
        );
        fs::write(current.path().join("README.txt"), "not an archive").unwrap();

        let mut resolver =
            LocationResolver::from_archive_dirs(current.path(), Some(prior.path()), "_public.xml")
                .unwrap();

        let source = resolver.open("201900001").unwrap().unwrap();
        assert_eq!(source.text, "current");
        assert!(source.origin.contains("2019_TEOS_XML_01A/201900001_public.xml"));
        assert_eq!(resolver.open("201900002").unwrap().unwrap().text, "prior only");
        assert_eq!(resolver.inventory().unwrap().len(), 2);
    }

    #[test]
    fn test_first_registered_archive_wins() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("2020_A.zip");
        let second = dir.path().join("2020_B.zip");
        write_zip(&first, &[("x/202000001_public.xml", "first"), ("x/", "")]);
        write_zip(
            &second,
            &[("y/202000001_public.xml", "second"), ("y/202000002_public.xml", "other")],
        );

        let mut set = ArchiveSet::open([&first, &second]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.members().collect::<Vec<_>>(),
            vec!["202000001_public.xml", "202000002_public.xml"]
        );

        let (origin, bytes) = set.read("202000001_public.xml").unwrap().unwrap();
        assert_eq!(bytes, b"first");
        assert!(origin.contains("2020_A.zip"));
        assert!(set.read("missing.xml").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_name_within_one_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2019_A.zip");
        write_zip(
            &path,
            &[("a/201900001_public.xml", "from a"), ("b/201900001_public.xml", "from b")],
        );

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let mut set =
            tracing::subscriber::with_default(subscriber, || ArchiveSet::open([&path])).unwrap();

        assert_eq!(set.len(), 1);
        assert!(set.contains("201900001_public.xml"));
        let (origin, bytes) = set.read("201900001_public.xml").unwrap().unwrap();
        assert_eq!(bytes, b"from a");
        assert!(origin.ends_with("2019_A.zip:a/201900001_public.xml"));
    }

    #[test]
    fn test_corrupt_archive_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2018_bad.zip");
        fs::write(&path, "not a zip").unwrap();

        let err = ArchiveSet::open([&path]).unwrap_err();
        assert!(matches!(err, FilingError::Archive { .. }));
    }

    #[test]
    fn test_missing_root() {
        let missing = Path::new("/nonexistent/filings");
        let err = LocationResolver::from_directory_tree(missing, "_public.xml").unwrap_err();
        assert!(matches!(err, FilingError::Io { .. }));
    }
}
