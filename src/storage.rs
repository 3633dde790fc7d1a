use crate::solver::SolutionSnapshot;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub trait Storage {
    /// Carga un snapshot de solución desde un soporte.
    fn load(&self) -> Result<SolutionSnapshot>;
    /// Guardado atómico.
    fn save(&self, snapshot: &SolutionSnapshot) -> Result<()>;
}

/// Snapshot JSON en disco. Valida la coherencia estructural en ambos
/// sentidos: nunca persiste un snapshot incoherente ni acepta uno al
/// cargar, para que un archivo editado a mano no llegue al solver.
pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            path: path.as_ref().to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for JsonStorage {
    fn load(&self) -> Result<SolutionSnapshot> {
        let raw =
            fs::read(&self.path).with_context(|| format!("reading {}", self.path.display()))?;
        let snapshot: SolutionSnapshot = serde_json::from_slice(&raw)
            .with_context(|| format!("parsing snapshot {}", self.path.display()))?;
        snapshot
            .validate()
            .with_context(|| format!("snapshot {} is inconsistent", self.path.display()))?;
        Ok(snapshot)
    }

    fn save(&self, snapshot: &SolutionSnapshot) -> Result<()> {
        snapshot
            .validate()
            .context("refusing to persist an inconsistent snapshot")?;
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut staged = NamedTempFile::new_in(dir)
            .with_context(|| format!("staging snapshot next to {}", self.path.display()))?;
        serde_json::to_writer_pretty(&mut staged, snapshot)?;
        staged.write_all(b"\n")?;
        staged.as_file().sync_all()?;
        staged
            .persist(&self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}
