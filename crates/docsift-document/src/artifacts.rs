// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// On-disk artifact layout.
//
//     <root>/files            uploaded documents
//     <root>/res              exported data
//     <root>/img/pages        rasterized pages
//     <root>/img/annotated    page_{n}_annotated.png
//     <root>/img/texts        page_{n}_text.png
//     <root>/img/tables       page_{n}_table_{i}.png
//     <root>/img/figures      page_{n}_figure_{i}.png

use std::path::{Path, PathBuf};

use docsift_core::RegionClass;
use docsift_core::error::Result;
use tracing::{debug, info, instrument};

/// Where every artifact of the current document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("files")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("res")
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.root.join("img").join("pages")
    }

    pub fn annotated_dir(&self) -> PathBuf {
        self.root.join("img").join("annotated")
    }

    /// Directory for one region class: `texts`, `tables`, or `figures`.
    pub fn region_dir(&self, class: RegionClass) -> PathBuf {
        self.root.join("img").join(format!("{}s", class.as_str()))
    }

    fn all_dirs(&self) -> [PathBuf; 7] {
        [
            self.uploads_dir(),
            self.data_dir(),
            self.pages_dir(),
            self.annotated_dir(),
            self.region_dir(RegionClass::Text),
            self.region_dir(RegionClass::Table),
            self.region_dir(RegionClass::Figure),
        ]
    }

    /// `page_{page}_{class}_{index}.png` under the class directory.
    pub fn crop_path(&self, page: usize, class: RegionClass, index: usize) -> PathBuf {
        self.region_dir(class)
            .join(format!("page_{page}_{class}_{index}.png"))
    }

    /// `page_{page}_text.png`, the reconstructed text canvas.
    pub fn canvas_path(&self, page: usize) -> PathBuf {
        self.region_dir(RegionClass::Text)
            .join(format!("page_{page}_text.png"))
    }

    /// `page_{page}_annotated.png`, the review overlay.
    pub fn annotated_path(&self, page: usize) -> PathBuf {
        self.annotated_dir().join(format!("page_{page}_annotated.png"))
    }

    /// Create every directory of the layout.
    pub fn ensure(&self) -> Result<()> {
        for dir in self.all_dirs() {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Empty every directory of the layout so nothing from the previous
    /// document can show up in the next one's region lists.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn clear(&self) -> Result<()> {
        let mut removed = 0usize;
        for dir in self.all_dirs() {
            if !dir.exists() {
                continue;
            }
            for entry in std::fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    std::fs::remove_dir_all(&path)?;
                } else {
                    std::fs::remove_file(&path)?;
                }
                removed += 1;
            }
        }
        self.ensure()?;
        info!(removed, "Artifact directories cleared");
        Ok(())
    }
}

/// Delete one artifact. Returns `false` if it was already gone.
pub fn remove_artifact(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Artifact removed");
            Ok(true)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_names() {
        let layout = ArtifactLayout::new("upload");
        assert_eq!(
            layout.crop_path(3, RegionClass::Table, 7),
            PathBuf::from("upload/img/tables/page_3_table_7.png")
        );
        assert_eq!(
            layout.crop_path(1, RegionClass::Figure, 0),
            PathBuf::from("upload/img/figures/page_1_figure_0.png")
        );
        assert_eq!(
            layout.canvas_path(2),
            PathBuf::from("upload/img/texts/page_2_text.png")
        );
        assert_eq!(
            layout.annotated_path(2),
            PathBuf::from("upload/img/annotated/page_2_annotated.png")
        );
    }

    #[test]
    fn clear_removes_stale_artifacts_and_keeps_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = ArtifactLayout::new(dir.path());
        layout.ensure().expect("ensure");

        let stale = layout.crop_path(1, RegionClass::Table, 0);
        std::fs::write(&stale, b"old").expect("write");
        std::fs::write(layout.data_dir().join("old.csv"), b"a,b").expect("write");

        layout.clear().expect("clear");
        assert!(!stale.exists());
        assert!(layout.region_dir(RegionClass::Table).is_dir());
        assert_eq!(
            std::fs::read_dir(layout.data_dir()).expect("read").count(),
            0
        );
    }

    #[test]
    fn clear_on_fresh_root_creates_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = ArtifactLayout::new(dir.path().join("fresh"));
        layout.clear().expect("clear");
        assert!(layout.pages_dir().is_dir());
    }

    #[test]
    fn remove_artifact_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("page_1_figure_0.png");
        std::fs::write(&path, b"png").expect("write");
        assert!(remove_artifact(&path).expect("remove"));
        assert!(!remove_artifact(&path).expect("remove again"));
    }
}
