//! Lecteur de ressources Servo.
//!
//! Servo a besoin d'un ensemble de fichiers de ressources (préférences,
//! certificats, domaines publics, etc.). L'embedder fournit une
//! implémentation de `ResourceReaderMethods` enregistrée via
//! `servo::resources::set()`.
//!
//! Ordre de recherche du dossier `resources/` :
//! 1. Variable d'environnement `SERVO_RESOURCES_PATH`
//! 2. À côté de l'exécutable (`<exe_dir>/resources/`), ou à la racine du
//!    projet quand l'exécutable est sous `target/{debug,release}/`
//! 3. Dans le répertoire courant (`./resources/`)

use std::path::{Path, PathBuf};
use std::{env, fs};

use servo::resources::{self, Resource};
use thiserror::Error;
use tracing::{debug, error};

const RESOURCES_ENV: &str = "SERVO_RESOURCES_PATH";

#[derive(Debug, Error)]
pub enum ResourcesError {
    #[error(
        "Servo 'resources/' directory not found; set {RESOURCES_ENV} or place it next to the executable"
    )]
    NotFound,
}

/// Initialise le lecteur de ressources Servo.
///
/// **Doit être appelé avant `ServoBuilder::build()`**, sinon Servo
/// paniquera avec "Resource reader not set".
pub fn init() -> Result<PathBuf, ResourcesError> {
    let dir = find_resources_dir(&candidate_dirs()).ok_or(ResourcesError::NotFound)?;
    let dir = dir.canonicalize().unwrap_or(dir);
    debug!(dir = %dir.display(), "Servo resources located");
    resources::set(Box::new(ResourceReader { dir: dir.clone() }));
    Ok(dir)
}

struct ResourceReader {
    dir: PathBuf,
}

impl resources::ResourceReaderMethods for ResourceReader {
    fn read(&self, file: Resource) -> Vec<u8> {
        match read_within(&self.dir, file.filename()) {
            Ok(bytes) => bytes,
            Err(e) => {
                // Servo treats a missing resource as fatal; there is nothing
                // left to return.
                error!(file = file.filename(), error = %e, "Cannot read Servo resource");
                panic!("cannot read Servo resource {}: {e}", file.filename());
            }
        }
    }

    fn sandbox_access_files_dirs(&self) -> Vec<PathBuf> {
        vec![self.dir.clone()]
    }

    fn sandbox_access_files(&self) -> Vec<PathBuf> {
        vec![]
    }
}

/// Reads `name` from `dir`, refusing anything that resolves outside it.
fn read_within(dir: &Path, name: &str) -> std::io::Result<Vec<u8>> {
    let base = dir.canonicalize()?;
    let path = base.join(name).canonicalize()?;
    if !path.starts_with(&base) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            format!("{} escapes {}", path.display(), base.display()),
        ));
    }
    fs::read(path)
}

/// Candidate directories in search order.
fn candidate_dirs() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(path) = env::var(RESOURCES_ENV) {
        candidates.push(PathBuf::from(path));
    }

    if let Ok(exe) = env::current_exe().and_then(|p| p.canonicalize())
        && let Some(exe_dir) = exe.parent()
    {
        candidates.push(exe_dir.join("resources"));
        // cargo run: target/{debug,release}/ → racine du projet
        if let Some(target_dir) = exe_dir.parent()
            && target_dir.file_name().is_some_and(|n| n == "target")
            && let Some(project_root) = target_dir.parent()
        {
            candidates.push(project_root.join("resources"));
        }
    }

    if let Ok(cwd) = env::current_dir() {
        candidates.push(cwd.join("resources"));
    }

    candidates
}

fn find_resources_dir(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.is_dir()).cloned()
}
