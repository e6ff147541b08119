use std::fmt;
use std::path::Path;
use std::str::FromStr;

use mapverify_archive::ClassArchive;
use mapverify_classfile::ClassFile;
use mapverify_config::{NamingConfig, OverrideStrategy, VerifierConfig};
use mapverify_hierarchy::ClassDirectory;
use mapverify_mappings::{ConstructorTable, MappingError, Mappings, SuffixTable};
use serde::Serialize;
use thiserror::Error;

use crate::{
    AccessLevelChecker, ClassNameChecker, ConstructorChecker, Finding, OverrideNameChecker,
    UniqueIdChecker, UnnamedClassChecker, Verifier, VerifyContext,
};

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("unknown task `{name}` (known tasks: {known})")]
    UnknownTask { name: String, known: String },
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Archive(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    AccessLevels,
    OverrideNames,
    UniqueIds,
    Constructors,
    ClassNames,
    UnnamedClasses,
}

impl Task {
    pub const ALL: [Task; 6] = [
        Task::AccessLevels,
        Task::OverrideNames,
        Task::UniqueIds,
        Task::Constructors,
        Task::ClassNames,
        Task::UnnamedClasses,
    ];

    /// Tasks run when none are requested.
    pub const DEFAULT: [Task; 3] = [Task::AccessLevels, Task::OverrideNames, Task::UniqueIds];

    pub fn verifier(self) -> &'static dyn Verifier {
        match self {
            Task::AccessLevels => &AccessLevelChecker,
            Task::OverrideNames => &OverrideNameChecker,
            Task::UniqueIds => &UniqueIdChecker,
            Task::Constructors => &ConstructorChecker,
            Task::ClassNames => &ClassNameChecker,
            Task::UnnamedClasses => &UnnamedClassChecker,
        }
    }

    pub fn name(self) -> &'static str {
        self.verifier().name()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Task {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Task::ALL
            .into_iter()
            .find(|task| task.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| VerifyError::UnknownTask {
                name: wanted.to_owned(),
                known: Task::ALL.map(Task::name).join(", "),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub task: Task,
    pub passed: bool,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub passed: bool,
    pub tasks: Vec<TaskReport>,
}

impl VerifyReport {
    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn task(&self, task: Task) -> Option<&TaskReport> {
        self.tasks.iter().find(|report| report.task == task)
    }

    pub fn finding_count(&self) -> usize {
        self.tasks.iter().map(|report| report.findings.len()).sum()
    }
}

/// Loads the jar under test and its libraries, then runs the selected verifiers over the
/// resolved hierarchy.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use mapverify_checks::MappingVerifier;
/// use mapverify_mappings::Mappings;
///
/// let mappings = Mappings::load("joined.tsrg".as_ref())?;
/// let mut verifier = MappingVerifier::new(mappings);
/// verifier.load_jar("client.jar".as_ref())?;
/// verifier.add_default_tasks();
/// let report = verifier.verify();
/// println!("passed: {}", report.passed());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MappingVerifier {
    directory: ClassDirectory,
    mappings: Mappings,
    reverse: Mappings,
    constructors: Option<ConstructorTable>,
    suffixes: Option<SuffixTable>,
    naming: NamingConfig,
    override_strategy: OverrideStrategy,
    tasks: Vec<Task>,
    resolved: bool,
}

impl MappingVerifier {
    pub fn new(mappings: Mappings) -> Self {
        let reverse = mappings.reverse();
        Self {
            directory: ClassDirectory::new(),
            mappings,
            reverse,
            constructors: None,
            suffixes: None,
            naming: NamingConfig::default(),
            override_strategy: OverrideStrategy::default(),
            tasks: Vec::new(),
            resolved: false,
        }
    }

    /// Applies naming rules, override strategy and task list from a config file.
    pub fn configure(&mut self, config: &VerifierConfig) -> Result<(), VerifyError> {
        self.naming = config.naming.clone();
        self.override_strategy = config.override_strategy;
        for task in &config.tasks {
            self.add_task(task)?;
        }
        Ok(())
    }

    pub fn set_naming(&mut self, naming: NamingConfig) {
        self.naming = naming;
    }

    pub fn set_override_strategy(&mut self, strategy: OverrideStrategy) {
        self.override_strategy = strategy;
    }

    pub fn set_constructors(&mut self, table: ConstructorTable) {
        self.constructors = Some(table);
    }

    pub fn set_suffixes(&mut self, table: SuffixTable) {
        self.suffixes = Some(table);
    }

    pub fn load_constructors(&mut self, path: &Path) -> Result<(), VerifyError> {
        let table = ConstructorTable::load(path)?;
        tracing::info!(path = %path.display(), entries = table.len(), "loaded constructor ids");
        self.set_constructors(table);
        Ok(())
    }

    pub fn load_suffixes(&mut self, path: &Path) -> Result<(), VerifyError> {
        let table = SuffixTable::load(path)?;
        tracing::info!(path = %path.display(), "loaded class suffixes");
        self.set_suffixes(table);
        Ok(())
    }

    pub fn directory(&self) -> &ClassDirectory {
        &self.directory
    }

    pub fn mappings(&self) -> &Mappings {
        &self.mappings
    }

    /// Loads the classes under test. Returns the number of classes ingested.
    pub fn load_jar(&mut self, path: &Path) -> Result<usize, VerifyError> {
        self.load_archive(path, true)
    }

    /// Loads classes that are only referenced (dependencies, the JDK). Returns the number of
    /// classes ingested.
    pub fn load_library(&mut self, path: &Path) -> Result<usize, VerifyError> {
        self.load_archive(path, false)
    }

    fn load_archive(&mut self, path: &Path, owned: bool) -> Result<usize, VerifyError> {
        let entries = ClassArchive::new(path).read_classes()?;
        let mut loaded = 0;
        for entry in entries {
            match ClassFile::parse(&entry.bytes) {
                Ok(class) => {
                    if self.ingest(class, owned) {
                        loaded += 1;
                    }
                }
                Err(err) => tracing::warn!(
                    archive = %path.display(),
                    entry = %entry.name,
                    error = %err,
                    "skipping undecodable class"
                ),
            }
        }
        tracing::info!(path = %path.display(), owned, classes = loaded, "loaded archive");
        Ok(loaded)
    }

    /// Adds one decoded class. Classes failing validation are logged and skipped.
    pub fn ingest(&mut self, class: ClassFile, owned: bool) -> bool {
        match self.directory.ingest(class, owned) {
            Ok(_) => {
                self.resolved = false;
                true
            }
            Err(fault) => {
                tracing::warn!(error = %fault, "skipping class");
                false
            }
        }
    }

    pub fn add_default_tasks(&mut self) {
        for task in Task::DEFAULT {
            self.push_task(task);
        }
    }

    /// Adds a task by name (case-insensitive). Adding a task twice has no effect.
    pub fn add_task(&mut self, name: &str) -> Result<(), VerifyError> {
        let task = name.parse()?;
        self.push_task(task);
        Ok(())
    }

    pub fn push_task(&mut self, task: Task) {
        if !self.tasks.contains(&task) {
            self.tasks.push(task);
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Resolves the hierarchy (once) and runs every selected task, or the default tasks when
    /// none were selected.
    pub fn verify(&mut self) -> VerifyReport {
        if !self.resolved {
            tracing::info!(classes = self.directory.len(), "resolving class hierarchy");
            self.directory.resolve_all();
            self.resolved = true;
        }

        let tasks = if self.tasks.is_empty() {
            Task::DEFAULT.to_vec()
        } else {
            self.tasks.clone()
        };
        let ctx = VerifyContext {
            directory: &self.directory,
            mappings: &self.mappings,
            reverse: &self.reverse,
            constructors: self.constructors.as_ref(),
            suffixes: self.suffixes.as_ref(),
            naming: &self.naming,
            override_strategy: self.override_strategy,
        };

        let mut report = VerifyReport {
            passed: true,
            tasks: Vec::with_capacity(tasks.len()),
        };
        for task in tasks {
            tracing::info!(task = %task, "running task");
            let findings = task.verifier().verify(&ctx);
            let passed = findings.is_empty();
            for finding in &findings {
                tracing::debug!(task = %task, "{finding}");
            }
            tracing::info!(task = %task, passed, findings = findings.len(), "task finished");
            report.passed &= passed;
            report.tasks.push(TaskReport {
                task,
                passed,
                findings,
            });
        }
        report
    }
}
