// crates/fv_mesh/src/reader.rs

//! 文本网格文件读取
//!
//! 网格目录下的 `mesh` 文件描述拓扑，三个块依次为：
//!
//! ```text
//! vertices N { x y z ... }
//! faces N { m v1 ... vm owner neighbor ... }
//! patches N { name count ... }
//! ```
//!
//! 面按内部面在前排列，边界面按 patches 块的顺序分组连续；
//! 边界面的 neighbor 写 -1。多进程运行时 rank r 读取目录
//! `<mesh_name><r>`，进程间边界片名为 `PROCESSOR<对端rank>`。

use std::path::{Path, PathBuf};

use fv_core::{CellIndex, Vector};

use crate::generation::processor_rank;
use crate::topology::{CsrConnectivity, Mesh, Patch};
use crate::MeshError;

/// 读取网格目录下的 `mesh` 文件并完成几何推导
pub fn read_mesh(dir: &Path, name: &str) -> Result<Mesh, MeshError> {
    if !dir.is_dir() {
        return Err(MeshError::DirectoryMissing(dir.to_path_buf()));
    }
    let path = dir.join("mesh");
    let text = std::fs::read_to_string(&path).map_err(|source| MeshError::Read {
        path: path.clone(),
        source,
    })?;

    let mut mesh = parse_mesh(&text, name)?;
    crate::geometry::init_geom(&mut mesh)?;
    log::info!(
        "读取网格 '{}': {} 单元 / {} 面",
        name,
        mesh.ghost_cells_start(),
        mesh.n_faces()
    );
    Ok(mesh)
}

/// rank r 的网格目录：单进程为 `<name>`，多进程为 `<name><r>`
pub fn mesh_dir(base: &Path, name: &str, host_id: usize, n_hosts: usize) -> PathBuf {
    if n_hosts > 1 {
        base.join(format!("{}{}", name, host_id))
    } else {
        base.join(name)
    }
}

/// 解析网格文本
pub fn parse_mesh(text: &str, name: &str) -> Result<Mesh, MeshError> {
    let mut tok = Tokens::new(text);

    tok.expect_keyword("vertices")?;
    let n_verts = tok.usize("顶点数")?;
    tok.expect_symbol("{")?;
    let mut vertices = Vec::with_capacity(n_verts);
    for _ in 0..n_verts {
        let x = tok.scalar("顶点坐标")?;
        let y = tok.scalar("顶点坐标")?;
        let z = tok.scalar("顶点坐标")?;
        vertices.push(Vector::new(x, y, z));
    }
    tok.expect_symbol("}")?;

    tok.expect_keyword("faces")?;
    let n_faces = tok.usize("面数")?;
    tok.expect_symbol("{")?;
    let mut face_rows = Vec::with_capacity(n_faces);
    let mut owner = Vec::with_capacity(n_faces);
    let mut neighbor = Vec::with_capacity(n_faces);
    for f in 0..n_faces {
        let m = tok.usize("面顶点数")?;
        if m < 3 {
            return Err(MeshError::format(format!("面 {} 顶点数 {} < 3", f, m)));
        }
        let mut row = Vec::with_capacity(m);
        for _ in 0..m {
            let v = tok.usize("面顶点编号")?;
            if v >= n_verts {
                return Err(MeshError::format(format!("面 {} 引用越界顶点 {}", f, v)));
            }
            row.push(v as u32);
        }
        face_rows.push(row);
        owner.push(CellIndex::new(tok.usize("owner")?));
        let n = tok.int("neighbor")?;
        neighbor.push(if n < 0 {
            CellIndex::invalid()
        } else {
            CellIndex::new(n as usize)
        });
    }
    tok.expect_symbol("}")?;

    tok.expect_keyword("patches")?;
    let n_patches = tok.usize("边界片数")?;
    tok.expect_symbol("{")?;
    let n_interior = neighbor.iter().filter(|n| n.is_valid()).count();
    let mut patches = Vec::with_capacity(n_patches);
    let mut next = n_interior;
    for _ in 0..n_patches {
        let pname = tok.word("边界片名称")?;
        let count = tok.usize("边界片面数")?;
        patches.push(Patch {
            neighbor_rank: processor_rank(&pname),
            name: pname,
            start: next,
            count,
        });
        next += count;
    }
    tok.expect_symbol("}")?;

    Mesh::from_raw(
        name.to_string(),
        vertices,
        CsrConnectivity::from_rows(&face_rows),
        owner,
        neighbor,
        patches,
    )
}

/// 空白分隔的 token 流
///
/// `{` `}` 作为独立 token 处理，容忍任意换行与缩进。
struct Tokens<'a> {
    iter: std::iter::Peekable<std::str::SplitWhitespace<'a>>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            iter: text.split_whitespace().peekable(),
        }
    }

    fn next(&mut self, what: &str) -> Result<&'a str, MeshError> {
        self.iter
            .next()
            .ok_or_else(|| MeshError::format(format!("文件提前结束，期望 {}", what)))
    }

    fn word(&mut self, what: &str) -> Result<String, MeshError> {
        Ok(self.next(what)?.to_string())
    }

    fn usize(&mut self, what: &str) -> Result<usize, MeshError> {
        let t = self.next(what)?;
        t.parse()
            .map_err(|_| MeshError::format(format!("{} 不是非负整数: '{}'", what, t)))
    }

    fn int(&mut self, what: &str) -> Result<i64, MeshError> {
        let t = self.next(what)?;
        t.parse()
            .map_err(|_| MeshError::format(format!("{} 不是整数: '{}'", what, t)))
    }

    fn scalar(&mut self, what: &str) -> Result<f64, MeshError> {
        let t = self.next(what)?;
        t.parse()
            .map_err(|_| MeshError::format(format!("{} 不是数值: '{}'", what, t)))
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<(), MeshError> {
        let t = self.next(kw)?;
        if t.eq_ignore_ascii_case(kw) {
            Ok(())
        } else {
            Err(MeshError::format(format!("期望 '{}' 实际 '{}'", kw, t)))
        }
    }

    fn expect_symbol(&mut self, sym: &str) -> Result<(), MeshError> {
        let t = self.next(sym)?;
        if t == sym {
            Ok(())
        } else {
            Err(MeshError::format(format!("期望 '{}' 实际 '{}'", sym, t)))
        }
    }
}
