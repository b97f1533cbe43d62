// crates/fv_io/src/vtk.rs

//! legacy VTK 导出
//!
//! 把网格与单元场写为 ASCII 的 `DATASET UNSTRUCTURED_GRID`。
//! 单元以 VTK_CONVEX_POINT_SET (41) 表示（顶点集合即凸单元），
//! 与任意多面体单元的面式拓扑兼容。输出文件为网格目录下的
//! `out<io_step>.vtk`，只写内部单元。

use std::fmt::Write as _;

use fv_core::FieldValue;
use fv_solver::drivers::StepFields;
use fv_solver::world::World;

use crate::IoError;

/// 写出一个写出步的 VTK 文件
pub fn write_vtk(
    world: &World,
    io_step: usize,
    fields: &StepFields<'_>,
) -> Result<(), IoError> {
    let path = world.mesh_dir().join(format!("out{}.vtk", io_step));
    let text = render_vtk(world, fields);
    std::fs::write(&path, text).map_err(|e| IoError::write(&path, e))?;
    log::debug!("VTK 写出: {}", path.display());
    Ok(())
}

/// 生成 VTK 文本
pub fn render_vtk(world: &World, fields: &StepFields<'_>) -> String {
    let mesh = &world.mesh;
    let n_cells = mesh.ghost_cells_start();
    let mut out = String::new();

    let _ = writeln!(out, "# vtk DataFile Version 2.0");
    let _ = writeln!(out, "fvflow {}", mesh.name);
    let _ = writeln!(out, "ASCII");
    let _ = writeln!(out, "DATASET UNSTRUCTURED_GRID");

    // 顶点
    let verts = mesh.vertices();
    let _ = writeln!(out, "POINTS {} double", verts.len());
    for v in verts {
        let _ = writeln!(out, "{:.9e} {:.9e} {:.9e}", v.x, v.y, v.z);
    }

    // 单元：顶点集合（每单元去重后的面顶点并集）
    let mut cell_verts: Vec<Vec<u32>> = Vec::with_capacity(n_cells);
    let mut total = 0usize;
    for c in 0..n_cells {
        let mut vs: Vec<u32> = Vec::new();
        for &f in mesh.faces_of(c) {
            for &v in mesh.face_vertices(f as usize) {
                if !vs.contains(&v) {
                    vs.push(v);
                }
            }
        }
        total += vs.len() + 1;
        cell_verts.push(vs);
    }
    let _ = writeln!(out, "CELLS {} {}", n_cells, total);
    for vs in &cell_verts {
        let _ = write!(out, "{}", vs.len());
        for v in vs {
            let _ = write!(out, " {}", v);
        }
        let _ = writeln!(out);
    }
    let _ = writeln!(out, "CELL_TYPES {}", n_cells);
    for _ in 0..n_cells {
        let _ = writeln!(out, "41");
    }

    // 单元数据
    let _ = writeln!(out, "CELL_DATA {}", n_cells);
    for (name, field) in &fields.scalars {
        let _ = writeln!(out, "SCALARS {} double 1", name);
        let _ = writeln!(out, "LOOKUP_TABLE default");
        for c in 0..n_cells {
            let _ = writeln!(out, "{:.9e}", field[c]);
        }
    }
    for (name, field) in &fields.vectors {
        let _ = writeln!(out, "VECTORS {} double", name);
        for c in 0..n_cells {
            let v = field[c];
            let _ = writeln!(out, "{:.9e} {:.9e} {:.9e}", v.comp(0), v.comp(1), v.comp(2));
        }
    }
    out
}
