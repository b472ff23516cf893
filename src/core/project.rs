//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::{EntityId, EntityPrefix};

/// Directory holding project metadata
pub const PROJECT_DIR: &str = ".qms";

/// File suffix for every stored record
pub const RECORD_SUFFIX: &str = ".qms.yaml";

/// Represents a QMS project
#[derive(Debug)]
pub struct Project {
    /// Root directory of the project (parent of .qms/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                tracing::debug!("Found project at {}", current.display());
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Use an explicit root when given, otherwise discover from the working directory
    pub fn open(explicit: Option<&Path>) -> Result<Self, ProjectError> {
        match explicit {
            Some(path) => Self::discover_from(path),
            None => Self::discover(),
        }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(PROJECT_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::init_force(&root)
    }

    /// Force initialization even if .qms/ exists
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let qms_dir = root.join(PROJECT_DIR);

        std::fs::create_dir_all(&qms_dir).map_err(|e| ProjectError::IoError(e.to_string()))?;

        let config_path = qms_dir.join("config.yaml");
        std::fs::write(&config_path, Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        Self::create_entity_dirs(&root)?;

        tracing::info!("Initialized project at {}", root.display());
        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# QMS Project Configuration

# Default author for new records (can be overridden by global config)
# author: ""

# Editor to use for `qms ... edit` commands (default: $EDITOR)
# editor: ""

# Days before the due date at which a calibration is flagged as due soon
# calibration_warning_days: 30

# Per-family numbering overrides. Families: rnc, calibration, raw-material,
# dimensional, ndt, painting, lesson, action-plan, quote, order
# numbering:
#   quote:
#     prefix: "ORC-"
#     width: 4
#     floor: 1000
"#
    }

    fn create_entity_dirs(root: &Path) -> Result<(), ProjectError> {
        for prefix in EntityPrefix::all() {
            std::fs::create_dir_all(root.join(Self::entity_directory(*prefix)))
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }
        Ok(())
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .qms configuration directory
    pub fn qms_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Get the path for a new entity file
    pub fn entity_path(&self, id: &EntityId) -> PathBuf {
        self.entity_dir(id.prefix())
            .join(format!("{}{}", id, RECORD_SUFFIX))
    }

    /// Absolute directory for a record type
    pub fn entity_dir(&self, prefix: EntityPrefix) -> PathBuf {
        self.root.join(Self::entity_directory(prefix))
    }

    /// Get the directory for a given entity prefix
    pub fn entity_directory(prefix: EntityPrefix) -> &'static str {
        match prefix {
            EntityPrefix::Rnc => "quality/rncs",
            EntityPrefix::Cal => "quality/calibrations",
            EntityPrefix::Insp => "quality/inspections",
            EntityPrefix::Lsn => "quality/lessons",
            EntityPrefix::Plan => "quality/action-plans",
            EntityPrefix::Quot => "sales/quotes",
            EntityPrefix::Ord => "sales/orders",
        }
    }

    /// Iterate all entity files of a given prefix type
    pub fn iter_entity_files(&self, prefix: EntityPrefix) -> impl Iterator<Item = PathBuf> {
        walkdir::WalkDir::new(self.entity_dir(prefix))
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().to_string_lossy().ends_with(RECORD_SUFFIX))
            .map(|e| e.path().to_path_buf())
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a QMS project (searched from {searched_from:?}). Run 'qms init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("QMS project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
