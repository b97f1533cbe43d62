// crates/fv_io/src/probe.rs

//! 探针点记录
//!
//! 每个探针位置在启动时定位到最近的内部单元，之后每步把
//! 各场在这些单元上的瞬时值追加到 `<场名>i` 文件
//! （U → `Ui`，p → `pi`），一行一格式：
//!
//! ```text
//! <step> <v(探针0)> <v(探针1)> ...
//! ```
//!
//! 文件在网格目录下打开一次，随 Drop 关闭并落盘。

use std::collections::HashMap;
use std::fs::File;
use std::io::Write as _;
use std::path::PathBuf;

use fv_core::{FieldValue, Vector};
use fv_mesh::Mesh;

use crate::IoError;

/// 探针记录器
pub struct ProbeWriter {
    dir: PathBuf,
    /// 探针单元编号
    cells: Vec<usize>,
    files: HashMap<String, File>,
}

impl ProbeWriter {
    /// 定位探针点
    ///
    /// 每个位置取距其最近的内部单元；无探针时记录器为空操作。
    pub fn new(mesh: &Mesh, points: &[Vector], dir: impl Into<PathBuf>) -> Self {
        let cells = points.iter().map(|&p| mesh.find_nearest(p)).collect();
        Self {
            dir: dir.into(),
            cells,
            files: HashMap::new(),
        }
    }

    /// 是否有探针
    pub fn is_active(&self) -> bool {
        !self.cells.is_empty()
    }

    /// 追加一行瞬时值
    pub fn record<T: FieldValue>(
        &mut self,
        name: &str,
        step: usize,
        values: impl Fn(usize) -> T,
    ) -> Result<(), IoError> {
        if self.cells.is_empty() {
            return Ok(());
        }
        let path = self.dir.join(format!("{}i", name));
        let file = match self.files.entry(name.to_string()) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(e) => {
                let f = File::create(&path).map_err(|err| IoError::write(&path, err))?;
                e.insert(f)
            }
        };

        let mut line = format!("{} ", step);
        for &c in &self.cells {
            let v = values(c);
            for k in 0..T::N_COMP {
                line.push_str(&format!("{:.9e} ", v.comp(k)));
            }
        }
        line.push('\n');
        file.write_all(line.as_bytes())
            .map_err(|err| IoError::write(&path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::generation::{structured_box, DEFAULT_PATCH_NAMES};

    #[test]
    fn test_probe_locates_nearest_cell() {
        let mesh = structured_box(
            4,
            4,
            1,
            Vector::ZERO,
            Vector::splat(1.0),
            &DEFAULT_PATCH_NAMES,
        )
        .unwrap();
        let probes = vec![Vector::new(0.1, 0.1, 0.5)];
        let w = ProbeWriter::new(&mesh, &probes, std::env::temp_dir());
        assert!(w.is_active());
        // (0.1, 0.1) 落在左下角单元（中心 0.125, 0.125）
        assert_eq!(w.cells[0], 0);
    }

    #[test]
    fn test_record_appends_lines() {
        let mesh = structured_box(
            2,
            2,
            1,
            Vector::ZERO,
            Vector::splat(1.0),
            &DEFAULT_PATCH_NAMES,
        )
        .unwrap();
        let dir = std::env::temp_dir().join("fvflow_probe_test");
        std::fs::create_dir_all(&dir).unwrap();
        let probes = vec![Vector::new(0.25, 0.25, 0.5), Vector::new(0.75, 0.75, 0.5)];
        let mut w = ProbeWriter::new(&mesh, &probes, &dir);

        w.record("p", 1, |_| 2.0_f64).unwrap();
        w.record("p", 2, |_| 3.0_f64).unwrap();
        drop(w);

        let text = std::fs::read_to_string(dir.join("pi")).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1 "));
        assert!(lines[1].starts_with("2 "));
    }
}
