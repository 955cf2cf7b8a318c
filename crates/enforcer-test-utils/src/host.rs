//! Fakes for elevation, filesystem and process-table access

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use enforcer_fs::FileSystem;
use enforcer_sys::{Elevation, ProcessTable};

/// Elevation state fixed at construction; relaunch requests are recorded
#[derive(Debug, Default)]
pub struct FakeElevation {
    elevated: bool,
    refuse_relaunch: bool,
    checks: Cell<u32>,
    relaunches: RefCell<Vec<Vec<OsString>>>,
}

impl FakeElevation {
    pub fn new(elevated: bool) -> Self {
        Self {
            elevated,
            ..Self::default()
        }
    }

    pub fn elevated() -> Self {
        Self::new(true)
    }

    pub fn not_elevated() -> Self {
        Self::new(false)
    }

    /// Make every relaunch request fail
    pub fn refuse_relaunch(mut self) -> Self {
        self.refuse_relaunch = true;
        self
    }

    pub fn checks(&self) -> u32 {
        self.checks.get()
    }

    /// Arguments of every relaunch request, in order
    pub fn relaunches(&self) -> Vec<Vec<OsString>> {
        self.relaunches.borrow().clone()
    }
}

impl Elevation for FakeElevation {
    fn is_elevated(&self) -> bool {
        self.checks.set(self.checks.get() + 1);
        self.elevated
    }

    fn relaunch_elevated(&self, args: &[OsString]) -> enforcer_sys::Result<()> {
        if self.refuse_relaunch {
            return Err(enforcer_sys::Error::Launch {
                path: "enforcer".to_string(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "elevation declined"),
            });
        }
        self.relaunches.borrow_mut().push(args.to_vec());
        Ok(())
    }
}

/// In-memory set of existing directories and files
#[derive(Debug, Default)]
pub struct FakeFs {
    dirs: BTreeSet<PathBuf>,
    files: BTreeSet<PathBuf>,
    failing: bool,
    dir_checks: Cell<u32>,
    file_checks: Cell<u32>,
}

impl FakeFs {
    /// An empty filesystem: nothing exists
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory containing the given file names
    pub fn installed(dir: &Path, files: &[&str]) -> Self {
        files
            .iter()
            .fold(Self::new().with_dir(dir), |fs, name| fs.with_file(dir.join(name)))
    }

    pub fn with_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.dirs.insert(path.into());
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.insert(path.into());
        self
    }

    /// Make every lookup fail with a permission error
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn dir_checks(&self) -> u32 {
        self.dir_checks.get()
    }

    pub fn file_checks(&self) -> u32 {
        self.file_checks.get()
    }

    fn lookup(&self, set: &BTreeSet<PathBuf>, path: &Path) -> enforcer_fs::Result<bool> {
        if self.failing {
            let source = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
            return Err(enforcer_fs::Error::io(path, source));
        }
        Ok(set.contains(path))
    }
}

impl FileSystem for FakeFs {
    fn file_exists(&self, path: &Path) -> enforcer_fs::Result<bool> {
        self.file_checks.set(self.file_checks.get() + 1);
        self.lookup(&self.files, path)
    }

    fn dir_exists(&self, path: &Path) -> enforcer_fs::Result<bool> {
        self.dir_checks.set(self.dir_checks.get() + 1);
        self.lookup(&self.dirs, path)
    }
}

/// Process table where launching an executable makes it appear as running
/// after a configurable number of lookups
#[derive(Debug, Default)]
pub struct FakeProcessTable {
    running: RefCell<BTreeSet<String>>,
    starting: RefCell<Vec<(String, u32)>>,
    startup_lookups: u32,
    failing: bool,
    launches: RefCell<Vec<PathBuf>>,
    lookups: Cell<u32>,
}

impl FakeProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_running(self, name: &str) -> Self {
        self.running.borrow_mut().insert(name.to_string());
        self
    }

    /// Launched processes only show up after this many further lookups
    pub fn with_startup_lookups(mut self, lookups: u32) -> Self {
        self.startup_lookups = lookups;
        self
    }

    /// Make enumeration and launching fail
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn launches(&self) -> Vec<PathBuf> {
        self.launches.borrow().clone()
    }

    pub fn lookups(&self) -> u32 {
        self.lookups.get()
    }

    fn advance_startups(&self) {
        let mut starting = self.starting.borrow_mut();
        let mut running = self.running.borrow_mut();
        starting.retain_mut(|(name, remaining)| {
            if *remaining == 0 {
                running.insert(name.clone());
                false
            } else {
                *remaining -= 1;
                true
            }
        });
    }
}

impl ProcessTable for FakeProcessTable {
    fn find_by_name(&self, name: &str) -> enforcer_sys::Result<bool> {
        self.lookups.set(self.lookups.get() + 1);
        if self.failing {
            return Err(enforcer_sys::Error::CommandFailed {
                program: "tasklist".to_string(),
                code: 1,
                message: "enumeration failed".to_string(),
            });
        }
        self.advance_startups();
        Ok(self.running.borrow().contains(name))
    }

    fn launch(&self, path: &Path, _args: &[&str]) -> enforcer_sys::Result<u32> {
        if self.failing {
            return Err(enforcer_sys::Error::Launch {
                path: path.display().to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
            });
        }
        self.launches.borrow_mut().push(path.to_path_buf());
        if let Some(name) = path.file_name() {
            let name = name.to_string_lossy().into_owned();
            self.starting.borrow_mut().push((name, self.startup_lookups));
        }
        Ok(4242 + self.launches.borrow().len() as u32)
    }
}
